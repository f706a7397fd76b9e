use std::fs;

use spydom_core::{Priority, TaskConfig};

use crate::session::EvalMode;
use crate::task::{Task, TaskContext, TaskError};

pub const JSRUNNER_FILENAME: &str = "jsrunner.txt";

/// Runs a user-supplied script and saves its completion value.
///
/// Only active when a script is supplied with `--js` or `--js-file`.
#[derive(Debug, Clone)]
pub struct JsRunner {
    script: String,
    priority: Priority,
}

impl Default for JsRunner {
    fn default() -> Self {
        Self {
            script: String::new(),
            priority: Priority::MAX,
        }
    }
}

impl JsRunner {
    pub fn script(&self) -> &str {
        &self.script
    }
}

#[async_trait::async_trait]
impl Task for JsRunner {
    fn slug(&self) -> &str {
        "jsrunner"
    }

    fn name(&self) -> &str {
        "JavaScript Runner"
    }

    fn description(&self) -> &str {
        "Run custom JavaScript on the page, supplied with --js or --js-file. \
         The value of the last statement is saved, e.g. 'x = document.domain; x'."
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn configured_priority(&self, config: &TaskConfig) -> Priority {
        Priority::new(config.js_priority).unwrap_or(self.priority)
    }

    fn is_configured(&self, config: &TaskConfig) -> bool {
        config.has_script()
    }

    fn init(&mut self, config: &TaskConfig) -> Result<(), TaskError> {
        self.priority =
            Priority::new(config.js_priority).map_err(|err| TaskError::Config(err.to_string()))?;

        self.script = match (&config.js, &config.js_file) {
            (Some(js), _) if !js.is_empty() => js.clone(),
            (_, Some(path)) => fs::read_to_string(path).map_err(|err| {
                TaskError::Config(format!("failed to read JS file {}: {err}", path.display()))
            })?,
            _ => return Err(TaskError::Config("no JavaScript specified".into())),
        };
        Ok(())
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let value = ctx.session.evaluate(&self.script, EvalMode::DevTools).await?;
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        ctx.writer().write_line(JSRUNNER_FILENAME, &text)?;
        Ok(())
    }
}
