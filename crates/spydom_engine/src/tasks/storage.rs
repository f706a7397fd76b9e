use spydom_core::Priority;

use crate::session::EvalMode;
use crate::task::{Task, TaskContext, TaskError};

/// Dumps `localStorage` and `sessionStorage` as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

#[async_trait::async_trait]
impl Task for LocalStorage {
    fn slug(&self) -> &str {
        "localstorage"
    }

    fn name(&self) -> &str {
        "Local Storage"
    }

    fn description(&self) -> &str {
        "Save the local storage and session storage of the loaded page"
    }

    fn priority(&self) -> Priority {
        Priority::PASSIVE
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let writer = ctx.writer();
        for (store, filename) in [
            ("localStorage", "localstorage.json"),
            ("sessionStorage", "sessionstorage.json"),
        ] {
            let script = format!("JSON.stringify({store})");
            let value = ctx.session.evaluate(&script, EvalMode::Page).await?;
            let json = value.as_str().ok_or_else(|| {
                TaskError::UnexpectedResult(format!("{store} did not serialize to a string"))
            })?;
            writer.write_line(filename, json)?;
        }
        Ok(())
    }
}
