use spydom_core::Priority;

use crate::task::{Task, TaskContext, TaskError};

/// Saves the DOM as rendered, after scripts have run.
#[derive(Debug, Default, Clone, Copy)]
pub struct OuterHtml;

#[async_trait::async_trait]
impl Task for OuterHtml {
    fn slug(&self) -> &str {
        "outerhtml"
    }

    fn name(&self) -> &str {
        "Outer HTML"
    }

    fn description(&self) -> &str {
        "Save the outer HTML of the rendered page"
    }

    fn priority(&self) -> Priority {
        Priority::PASSIVE
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let html = ctx.session.content().await?;
        ctx.writer().write_line("outerhtml.html", &html)?;
        Ok(())
    }
}
