#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use spydom_core::Priority;
use spydom_engine::{
    BrowserSession, EngineEvent, EvalMode, ProgressSink, SessionAllocator, SessionError, Task,
    TaskContext, TaskError,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// How a scripted page responds to navigation.
#[derive(Debug, Clone, Copy)]
pub enum PageBehaviour {
    /// Fail this many navigations, then succeed.
    FailTimes(u32),
    AlwaysFail,
    /// Never finish navigating within any sensible deadline.
    Hang,
}

#[derive(Default)]
pub struct BrowserScript {
    pages: Mutex<HashMap<String, PageBehaviour>>,
    navigations: Mutex<Vec<String>>,
    failures_so_far: Mutex<HashMap<String, u32>>,
    closed: Mutex<Vec<usize>>,
    shutdowns: Mutex<u32>,
    evaluations: Mutex<HashMap<String, serde_json::Value>>,
}

impl BrowserScript {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, url: &str, behaviour: PageBehaviour) {
        self.pages.lock().unwrap().insert(url.to_string(), behaviour);
    }

    /// Answer for `evaluate` calls whose script contains `needle`.
    pub fn evaluation(&self, needle: &str, value: serde_json::Value) {
        self.evaluations
            .lock()
            .unwrap()
            .insert(needle.to_string(), value);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn closed_sessions(&self) -> Vec<usize> {
        self.closed.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> u32 {
        *self.shutdowns.lock().unwrap()
    }
}

pub struct ScriptedSession {
    id: usize,
    script: Arc<BrowserScript>,
    current: Mutex<Option<String>>,
}

impl ScriptedSession {
    pub fn new(id: usize, script: Arc<BrowserScript>) -> Self {
        Self {
            id,
            script,
            current: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.script.navigations.lock().unwrap().push(url.to_string());
        let behaviour = self.script.pages.lock().unwrap().get(url).copied();
        match behaviour {
            Some(PageBehaviour::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SessionError::Navigation("hung".into()))
            }
            Some(PageBehaviour::AlwaysFail) => {
                Err(SessionError::Navigation(format!("cannot reach {url}")))
            }
            Some(PageBehaviour::FailTimes(n)) => {
                let mut failures = self.script.failures_so_far.lock().unwrap();
                let so_far = failures.entry(url.to_string()).or_insert(0);
                if *so_far < n {
                    *so_far += 1;
                    return Err(SessionError::Navigation(format!("flaky {url}")));
                }
                *self.current.lock().unwrap() = Some(url.to_string());
                Ok(())
            }
            None => {
                *self.current.lock().unwrap() = Some(url.to_string());
                Ok(())
            }
        }
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.current.lock().unwrap().clone().ok_or(SessionError::Closed)
    }

    async fn title(&self) -> Result<String, SessionError> {
        Ok(format!("Title of {}", self.current_url().await?))
    }

    async fn content(&self) -> Result<String, SessionError> {
        Ok("<html><body>scripted</body></html>".to_string())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn evaluate(
        &self,
        script: &str,
        _mode: EvalMode,
    ) -> Result<serde_json::Value, SessionError> {
        let evaluations = self.script.evaluations.lock().unwrap();
        evaluations
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| SessionError::Evaluation(format!("unscripted: {script}")))
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.script.closed.lock().unwrap().push(self.id);
        Ok(())
    }
}

/// Hands out scripted sessions; optionally fails after a number of sessions.
pub struct ScriptedAllocator {
    script: Arc<BrowserScript>,
    issued: Mutex<usize>,
    fail_after: Option<usize>,
}

impl ScriptedAllocator {
    pub fn new(script: Arc<BrowserScript>) -> Arc<Self> {
        Arc::new(Self {
            script,
            issued: Mutex::new(0),
            fail_after: None,
        })
    }

    pub fn failing_after(script: Arc<BrowserScript>, sessions: usize) -> Arc<Self> {
        Arc::new(Self {
            script,
            issued: Mutex::new(0),
            fail_after: Some(sessions),
        })
    }
}

#[async_trait::async_trait]
impl SessionAllocator for ScriptedAllocator {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let mut issued = self.issued.lock().unwrap();
        if self.fail_after.is_some_and(|limit| *issued >= limit) {
            return Err(SessionError::Launch("no more browsers".into()));
        }
        let id = *issued;
        *issued += 1;
        Ok(Box::new(ScriptedSession::new(id, self.script.clone())))
    }

    async fn shutdown(&self) -> Result<(), SessionError> {
        *self.script.shutdowns.lock().unwrap() += 1;
        Ok(())
    }
}

/// Shared log of `(slug, url)` in execution order.
pub type RunLog = Arc<Mutex<Vec<(String, String)>>>;

/// Task that records each run and optionally sleeps or fails.
pub struct RecordingTask {
    slug: String,
    priority: Priority,
    log: RunLog,
    max_latency_ms: u64,
    delay: Duration,
    fail: bool,
}

impl RecordingTask {
    pub fn new(slug: &str, priority: u8, log: RunLog) -> Self {
        Self {
            slug: slug.to_string(),
            priority: Priority::new(priority).unwrap(),
            log,
            max_latency_ms: 0,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    /// Sleep up to `ms` milliseconds, derived from the target and slug.
    pub fn with_latency(mut self, ms: u64) -> Self {
        self.max_latency_ms = ms;
        self
    }

    /// Always sleep for `delay` before recording.
    pub fn sleeping(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Task> {
        Box::new(self)
    }
}

#[async_trait::async_trait]
impl Task for RecordingTask {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn name(&self) -> &str {
        &self.slug
    }

    fn description(&self) -> &str {
        "records its runs"
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        if self.max_latency_ms > 0 {
            let mut hasher = DefaultHasher::new();
            (ctx.target.as_str(), &self.slug).hash(&mut hasher);
            let delay = hasher.finish() % (self.max_latency_ms + 1);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log
            .lock()
            .unwrap()
            .push((self.slug.clone(), ctx.target.to_string()));
        if self.fail {
            return Err(TaskError::UnexpectedResult(format!("{} failed", self.slug)));
        }
        Ok(())
    }
}

/// Writes a marker file that must not exist yet, so a target processed twice fails.
pub struct MarkerTask;

#[async_trait::async_trait]
impl Task for MarkerTask {
    fn slug(&self) -> &str {
        "marker"
    }

    fn name(&self) -> &str {
        "Marker"
    }

    fn description(&self) -> &str {
        "create-once marker file"
    }

    fn priority(&self) -> Priority {
        Priority::MAX
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(ctx.output_dir.join("marker"))?;
        Ok(())
    }
}

/// Panics mid-run, like a plugin with an indexing bug.
pub struct PanickingTask;

#[async_trait::async_trait]
impl Task for PanickingTask {
    fn slug(&self) -> &str {
        "panics"
    }

    fn name(&self) -> &str {
        "Panics"
    }

    fn description(&self) -> &str {
        "indexes past the end of an empty list"
    }

    fn priority(&self) -> Priority {
        Priority::MIN
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let found: Vec<u32> = Vec::new();
        let _ = found[ctx.attempt as usize + 2];
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}
