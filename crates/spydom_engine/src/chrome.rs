//! Chromium backend for [`SessionAllocator`] over the DevTools protocol.
//!
//! One browser process is launched per run. Every session is a separate
//! browser context (isolated cookies and storage) with a single page.

use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::session::{BrowserSession, EvalMode, SessionAllocator, SessionError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChromeOptions {
    /// Show the browser window instead of running headless.
    pub visible: bool,
    /// Ignore TLS certificate errors.
    pub insecure: bool,
}

pub struct ChromeAllocator {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    contexts: Mutex<Vec<BrowserContextId>>,
}

impl ChromeAllocator {
    pub async fn launch(options: ChromeOptions) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder();
        if options.visible {
            builder = builder.with_head();
        }
        if !options.insecure {
            builder = builder.respect_https_errors();
        }
        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| SessionError::Launch(err.to_string()))?;

        // The handler drives the websocket connection; it must be polled for the
        // browser to respond at all.
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    engine_debug!("Browser handler error: {}", err);
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handle)),
            contexts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl SessionAllocator for ChromeAllocator {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or(SessionError::Closed)?;

        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(protocol)?;
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(SessionError::Protocol)?;
        let page = browser.new_page(params).await.map_err(protocol)?;

        self.contexts.lock().await.push(context);
        Ok(Box::new(ChromeSession { page }))
    }

    async fn shutdown(&self) -> Result<(), SessionError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        for context in self.contexts.lock().await.drain(..).rev() {
            if let Err(err) = browser.dispose_browser_context(context).await {
                engine_warn!("Failed to dispose browser context: {}", err);
            }
        }
        let closed = browser.close().await.map(|_| ()).map_err(protocol);
        let _ = browser.wait().await;
        if let Some(handle) = self.handler.lock().await.take() {
            handle.abort();
        }
        closed
    }
}

pub struct ChromeSession {
    page: Page,
}

#[async_trait::async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|err| SessionError::Navigation(err.to_string()))
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.page.url().await.map_err(protocol)?.unwrap_or_default())
    }

    async fn title(&self) -> Result<String, SessionError> {
        Ok(self.page.get_title().await.map_err(protocol)?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String, SessionError> {
        self.page.content().await.map_err(protocol)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(protocol)
    }

    async fn evaluate(
        &self,
        script: &str,
        mode: EvalMode,
    ) -> Result<serde_json::Value, SessionError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .include_command_line_api(mode == EvalMode::DevTools)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(SessionError::Evaluation)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|err| SessionError::Evaluation(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.page.clone().close().await.map_err(protocol)
    }
}

fn protocol(err: CdpError) -> SessionError {
    SessionError::Protocol(err.to_string())
}
