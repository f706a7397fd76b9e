use spydom_core::Priority;

use crate::task::{Task, TaskContext, TaskError};

/// Records the requested URL and where the browser ended up.
#[derive(Debug, Default, Clone, Copy)]
pub struct Location;

#[async_trait::async_trait]
impl Task for Location {
    fn slug(&self) -> &str {
        "location"
    }

    fn name(&self) -> &str {
        "Location"
    }

    fn description(&self) -> &str {
        "Save the requested URL and the final URL of the loaded page"
    }

    fn priority(&self) -> Priority {
        Priority::PASSIVE
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let final_url = ctx.session.current_url().await?;
        let writer = ctx.writer();
        writer.write_line("requested-url.txt", ctx.target.as_str())?;
        writer.write_line("final-url.txt", &final_url)?;
        Ok(())
    }
}
