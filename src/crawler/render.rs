//! Headless browser rendering
//!
//! Pages that only assemble their markup in JavaScript are loaded in a
//! headless Chromium and serialized back to HTML. The browser is launched on
//! first use, reused for every later page, and closed by [`Renderer::shutdown`].

use crate::HarvestError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A running browser and the task that drives its CDP connection
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Lazily started headless browser owned by one fetcher
///
/// Access is serialized through an async mutex, so a renderer can be shared
/// by reference but never renders two pages at once.
pub struct Renderer {
    user_agent: String,
    session: Mutex<Option<BrowserSession>>,
}

impl Renderer {
    /// Creates a renderer; no browser is launched yet
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            session: Mutex::new(None),
        }
    }

    /// Returns true once a browser has been launched and not shut down
    pub async fn is_started(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Loads `url` and returns the serialized DOM after navigation settles
    ///
    /// The tab is opened blank and closed again whether or not navigation
    /// succeeds.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The rendered HTML
    /// * `Err(HarvestError::Render)` - Launch, navigation or serialization failed
    pub async fn render(&self, url: &str) -> Result<String, HarvestError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let Some(session) = guard.as_ref() else {
            return Err(render_error(url, "browser session unavailable"));
        };

        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| render_error(url, e))?;

        let rendered = match page.goto(url).await {
            Ok(page) => match page.wait_for_navigation().await {
                Ok(page) => page.content().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", url, e);
        }

        rendered.map_err(|e| render_error(url, e))
    }

    /// Closes the browser if it is running
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub async fn shutdown(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };

        if let Err(e) = session.browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = session.browser.wait().await {
            tracing::warn!("Failed to wait for browser exit: {}", e);
        }
        session.handler.abort();
        tracing::debug!("Headless browser shut down");
    }

    async fn launch(&self) -> Result<BrowserSession, HarvestError> {
        tracing::info!("Launching headless browser");

        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--mute-audio")
            .build()
            .map_err(|e| render_error("about:blank", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| render_error("about:blank", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
        });

        Ok(BrowserSession { browser, handler })
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Without an async context the browser cannot be closed gracefully;
        // stop the handler so the child process is reaped with the Browser.
        if let Some(session) = self.session.get_mut().take() {
            session.handler.abort();
        }
    }
}

fn render_error(url: &str, message: impl std::fmt::Display) -> HarvestError {
    HarvestError::Render {
        url: url.to_string(),
        message: message.to_string(),
    }
}
