use std::collections::HashSet;
use std::path::Path;

use spydom_core::Priority;

use crate::session::EvalMode;
use crate::task::{Task, TaskContext, TaskError};

const LISTENER_DIR: &str = "listeners";

/// Extracts the source of every listener registered for one DOM event.
///
/// Relies on `getEventListeners`, which only exists in the DevTools
/// command-line API.
#[derive(Debug, Clone)]
pub struct EventListeners {
    event: String,
    slug: String,
    name: String,
    description: String,
}

impl EventListeners {
    pub fn new(event: &str) -> Self {
        let mut title = event.to_string();
        if let Some(first) = title.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        Self {
            event: event.to_string(),
            slug: format!("{event}-listeners"),
            name: format!("{title} Listeners"),
            description: format!("Save the source of all '{event}' event listeners"),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    fn script(&self) -> String {
        let event = serde_json::Value::String(self.event.clone());
        format!(
            r#"(() => {{
    const nodes = [window, document, ...document.querySelectorAll("*")];
    const found = {{}};
    for (const node of nodes) {{
        for (const entry of (getEventListeners(node)[{event}] || [])) {{
            const base = entry.listener.name || "unnamed";
            let name = base;
            let n = 1;
            while (name in found) {{
                name = base + n;
                n += 1;
            }}
            found[name] = entry.listener.toString();
        }}
    }}
    return found;
}})()"#
        )
    }
}

#[async_trait::async_trait]
impl Task for EventListeners {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn priority(&self) -> Priority {
        Priority::PASSIVE
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let value = ctx
            .session
            .evaluate(&self.script(), EvalMode::DevTools)
            .await?;
        let listeners = value.as_object().ok_or_else(|| {
            TaskError::UnexpectedResult(format!("listener map for {} is not an object", self.event))
        })?;

        let writer = ctx.writer_in(Path::new(LISTENER_DIR).join(&self.event));
        let stems = unique_file_stems(listeners.keys().map(String::as_str));
        for (stem, source) in stems.iter().zip(listeners.values()) {
            let source = source.as_str().unwrap_or_default();
            writer.write_line(&format!("{stem}.js"), source)?;
        }
        Ok(())
    }
}

/// Listener names come from page scripts; keep them to a safe file stem.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '$') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// One stem per name; names that sanitize to the same stem get `_1`, `_2`, ... appended.
fn unique_file_stems<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let base = file_stem(name);
            let mut stem = base.clone();
            let mut n = 1;
            while !used.insert(stem.clone()) {
                stem = format!("{base}_{n}");
                n += 1;
            }
            stem
        })
        .collect()
}
