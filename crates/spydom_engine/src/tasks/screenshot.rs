use spydom_core::Priority;

use crate::task::{Task, TaskContext, TaskError};

pub const SCREENSHOT_FILENAME: &str = "screenshot.png";

/// Full-page PNG capture of the rendered document.
#[derive(Debug, Default, Clone, Copy)]
pub struct Screenshot;

#[async_trait::async_trait]
impl Task for Screenshot {
    fn slug(&self) -> &str {
        "screenshot"
    }

    fn name(&self) -> &str {
        "Screenshot"
    }

    fn description(&self) -> &str {
        "Save a full-page screenshot of the loaded page"
    }

    fn priority(&self) -> Priority {
        Priority::PASSIVE
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let png = ctx.session.screenshot().await?;
        if png.is_empty() {
            return Err(TaskError::UnexpectedResult("empty screenshot".into()));
        }
        ctx.writer().write(SCREENSHOT_FILENAME, png)?;
        Ok(())
    }
}
