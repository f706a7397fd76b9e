//! Spydom core: pure target, priority, filtering and configuration types.
mod config;
mod filter;
mod naming;
mod priority;
mod target;

pub use config::{ConfigError, RunConfig, TaskConfig, DEFAULT_OUTPUT_DIR};
pub use filter::TaskFilter;
pub use naming::output_dir_name;
pub use priority::{Priority, PriorityError};
pub use target::{parse_target_list, Target, TargetError, TargetList};
