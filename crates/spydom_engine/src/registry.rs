use std::collections::BTreeMap;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use spydom_core::{Priority, TaskConfig, TaskFilter};
use thiserror::Error;

use crate::task::{Task, TaskDescriptor, TaskError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("task slug `{0}` is registered twice")]
    DuplicateSlug(String),
    #[error("failed to initialise task `{slug}`: {source}")]
    Init {
        slug: String,
        #[source]
        source: TaskError,
    },
}

/// Available tasks in registration order, keyed by unique slug.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Vec<Box<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Box<dyn Task>) -> Result<(), RegistryError> {
        if self.tasks.iter().any(|t| t.slug() == task.slug()) {
            return Err(RegistryError::DuplicateSlug(task.slug().to_string()));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        tasks: impl IntoIterator<Item = Box<dyn Task>>,
    ) -> Result<(), RegistryError> {
        tasks.into_iter().try_for_each(|task| self.register(task))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.slug()).collect()
    }

    pub fn descriptors(&self, config: &TaskConfig) -> Vec<TaskDescriptor> {
        self.tasks
            .iter()
            .map(|t| TaskDescriptor::of(t.as_ref(), config))
            .collect()
    }

    /// Slugs of tasks whose external configuration is missing.
    pub fn unconfigured(&self, config: &TaskConfig) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| !t.is_configured(config))
            .map(|t| t.slug().to_string())
            .collect()
    }

    /// Keep only the tasks the filter allows, preserving registration order.
    pub fn filter(mut self, filter: &TaskFilter) -> Self {
        for unknown in filter.unknown(self.tasks.iter().map(|t| t.slug())) {
            engine_warn!("Ignoring unknown task slug `{}`", unknown);
        }
        self.tasks.retain(|t| filter.allows(t.slug()));
        self
    }

    /// Initialise every remaining task. The first failure aborts.
    pub fn init_all(&mut self, config: &TaskConfig) -> Result<(), RegistryError> {
        for task in &mut self.tasks {
            task.init(config).map_err(|source| RegistryError::Init {
                slug: task.slug().to_string(),
                source,
            })?;
            engine_debug!("Initialised task {} (priority {})", task.slug(), task.priority());
        }
        Ok(())
    }

    /// Freeze the registry into an execution plan grouped by priority tier.
    pub fn into_plan(self) -> TaskPlan {
        let mut tiers: BTreeMap<Priority, Vec<Arc<dyn Task>>> = BTreeMap::new();
        for task in self.tasks {
            tiers.entry(task.priority()).or_default().push(Arc::from(task));
        }
        TaskPlan { tiers }
    }

    /// Apply the user's filter plus auto-disabling, initialise, and freeze.
    pub fn prepare(
        self,
        mut filter: TaskFilter,
        config: &TaskConfig,
    ) -> Result<TaskPlan, RegistryError> {
        for slug in self.unconfigured(config) {
            engine_info!("Disabling task `{}`: required configuration not supplied", slug);
            filter.disable(slug);
        }
        let mut active = self.filter(&filter);
        active.init_all(config)?;
        Ok(active.into_plan())
    }
}

/// Active tasks, ready to run.
#[derive(Clone, Default)]
pub struct TaskPlan {
    tiers: BTreeMap<Priority, Vec<Arc<dyn Task>>>,
}

impl std::fmt::Debug for TaskPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.tiers.iter().map(|(p, tasks)| {
                (p, tasks.iter().map(|t| t.slug()).collect::<Vec<_>>())
            }))
            .finish()
    }
}

impl TaskPlan {
    /// Tiers in ascending priority; tasks within a tier in registration order.
    pub fn by_priority(&self) -> impl Iterator<Item = (Priority, &[Arc<dyn Task>])> {
        self.tiers.iter().map(|(p, tasks)| (*p, tasks.as_slice()))
    }

    /// All tasks in execution order.
    pub fn ordered(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.tiers.values().flatten()
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.ordered().map(|t| t.slug()).collect()
    }

    pub fn len(&self) -> usize {
        self.tiers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
