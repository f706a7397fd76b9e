//! Built-in analysis tasks.
mod jsrunner;
mod listeners;
mod location;
mod outerhtml;
mod screenshot;
mod storage;
mod title;

pub use jsrunner::JsRunner;
pub use listeners::EventListeners;
pub use location::Location;
pub use outerhtml::OuterHtml;
pub use screenshot::Screenshot;
pub use storage::LocalStorage;
pub use title::Title;

use crate::registry::{RegistryError, TaskRegistry};
use crate::task::Task;

/// Every built-in task, in registration order.
pub fn builtin() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(Screenshot),
        Box::new(EventListeners::new("message")),
        Box::new(EventListeners::new("hashchange")),
        Box::new(Location),
        Box::new(Title),
        Box::new(OuterHtml),
        Box::new(LocalStorage),
        Box::new(JsRunner::default()),
    ]
}

/// A registry holding every built-in task.
pub fn builtin_registry() -> Result<TaskRegistry, RegistryError> {
    let mut registry = TaskRegistry::new();
    registry.register_all(builtin())?;
    Ok(registry)
}
