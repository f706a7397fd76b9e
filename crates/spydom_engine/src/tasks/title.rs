use spydom_core::Priority;

use crate::task::{Task, TaskContext, TaskError};

#[derive(Debug, Default, Clone, Copy)]
pub struct Title;

#[async_trait::async_trait]
impl Task for Title {
    fn slug(&self) -> &str {
        "title"
    }

    fn name(&self) -> &str {
        "Title"
    }

    fn description(&self) -> &str {
        "Save the title of the loaded page"
    }

    fn priority(&self) -> Priority {
        Priority::PASSIVE
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let title = ctx.session.title().await?;
        ctx.writer().write_line("title.txt", &title)?;
        Ok(())
    }
}
