// Browser tools backed by a single shared headless page

use crate::executor::config::BrowserSettings;
use crate::executor::tool::{ToolImpl, parse_input};
use crate::executor::{ExecutorError, Result, ToolOutput};
use crate::protocol::{InputShape, ParamKind, ToolDescriptor};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Page operations the browser tools need
///
/// Implementations own the browser process and its page; tools borrow the
/// driver and never see the handles directly.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Start the browser if it is not already running
    async fn launch(&self) -> Result<()>;

    /// Navigate the page and wait for its load event
    ///
    /// Requests started after `load` may still be in flight; there is no
    /// network-idle wait.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Serialized HTML of the current page
    async fn content(&self) -> Result<String>;

    /// PNG capture of the viewport, or the whole page
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    /// Click the first element matching a CSS selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Tear down the browser; the next call launches a fresh one
    async fn reset(&self);
}

/// A running browser with its single page
struct BrowserSession {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
}

/// Chromium over the DevTools protocol, launched lazily on first use
pub struct ChromiumDriver {
    settings: BrowserSettings,
    session: Mutex<Option<BrowserSession>>,
}

impl ChromiumDriver {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            session: Mutex::new(None),
        }
    }

    async fn start_session(&self) -> Result<BrowserSession> {
        let width = self.settings.viewport_width;
        let height = self.settings.viewport_height;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Default::default()
            });
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ExecutorError::browser("initialize browser", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExecutorError::browser("initialize browser", e))?;

        // CDP events must be drained for any page command to complete
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event stream ended");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExecutorError::browser("initialize browser page", e))?;

        info!(width, height, "browser launched");
        Ok(BrowserSession {
            browser,
            page,
            events,
        })
    }

    async fn ensure<'a>(
        &self,
        slot: &'a mut Option<BrowserSession>,
    ) -> Result<&'a BrowserSession> {
        if slot.is_none() {
            *slot = Some(self.start_session().await?);
        }
        slot.as_ref()
            .ok_or_else(|| ExecutorError::browser("initialize browser page", "no active page"))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.ensure(&mut slot).await.map(|_| ())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let mut slot = self.session.lock().await;
        let session = self.ensure(&mut slot).await?;
        session
            .page
            .goto(url)
            .await
            .map_err(|e| ExecutorError::browser("navigate", e))?
            .wait_for_navigation()
            .await
            .map_err(|e| ExecutorError::browser("navigate", e))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let mut slot = self.session.lock().await;
        let session = self.ensure(&mut slot).await?;
        session
            .page
            .content()
            .await
            .map_err(|e| ExecutorError::browser("get content", e))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        let mut slot = self.session.lock().await;
        let session = self.ensure(&mut slot).await?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        session
            .page
            .screenshot(params)
            .await
            .map_err(|e| ExecutorError::browser("take screenshot", e))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut slot = self.session.lock().await;
        let session = self.ensure(&mut slot).await?;
        session
            .page
            .find_element(selector)
            .await
            .map_err(|e| ExecutorError::browser("click element", e))?
            .click()
            .await
            .map_err(|e| ExecutorError::browser("click element", e))?;
        Ok(())
    }

    async fn reset(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        if let Err(e) = session.browser.close().await {
            warn!(error = %e, "failed to close browser cleanly");
        }
        let _ = session.browser.wait().await;
        session.events.abort();
        info!("browser closed");
    }
}

/// Build the browser tool set around one shared driver
pub fn tools(driver: Arc<dyn BrowserDriver>) -> Vec<Arc<dyn ToolImpl>> {
    vec![
        Arc::new(GotoTool {
            driver: driver.clone(),
        }),
        Arc::new(ContentTool {
            driver: driver.clone(),
        }),
        Arc::new(ScreenshotTool {
            driver: driver.clone(),
        }),
        Arc::new(ClickTool { driver }),
    ]
}

#[derive(Debug, Deserialize)]
struct GotoInput {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ScreenshotInput {
    #[serde(default, rename = "fullPage")]
    full_page: bool,
}

#[derive(Debug, Deserialize)]
struct ClickInput {
    selector: String,
}

/// `goto`
pub struct GotoTool {
    driver: Arc<dyn BrowserDriver>,
}

#[async_trait]
impl ToolImpl for GotoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "goto".to_string(),
            description: "Navigate to a URL".to_string(),
            input_schema: InputShape::new().required(
                "url",
                ParamKind::String,
                "URL to navigate to",
            ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let GotoInput { url } = parse_input("goto", input)?;
        self.driver.goto(&url).await?;
        info!(url = %url, "navigated");
        Ok(ToolOutput::success(format!("Successfully navigated to {url}")))
    }
}

/// `content`
pub struct ContentTool {
    driver: Arc<dyn BrowserDriver>,
}

#[async_trait]
impl ToolImpl for ContentTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "content".to_string(),
            description: "Get the HTML content of the current page".to_string(),
            input_schema: InputShape::new(),
        }
    }

    async fn run(&self, _input: serde_json::Value) -> Result<ToolOutput> {
        Ok(ToolOutput::success(self.driver.content().await?))
    }
}

/// `screenshot`: PNG as a base64 data URL
pub struct ScreenshotTool {
    driver: Arc<dyn BrowserDriver>,
}

#[async_trait]
impl ToolImpl for ScreenshotTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "screenshot".to_string(),
            description: "Take a screenshot of the current page".to_string(),
            input_schema: InputShape::new().optional(
                "fullPage",
                ParamKind::Boolean,
                "Whether to take a screenshot of the full page or just the viewport",
            ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let ScreenshotInput { full_page } = parse_input("screenshot", input)?;
        let png = self.driver.screenshot(full_page).await?;
        debug!(bytes = png.len(), full_page = full_page, "screenshot captured");
        Ok(ToolOutput::success(format!(
            "data:image/png;base64,{}",
            STANDARD.encode(png)
        )))
    }
}

/// `click`
pub struct ClickTool {
    driver: Arc<dyn BrowserDriver>,
}

#[async_trait]
impl ToolImpl for ClickTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "click".to_string(),
            description: "Click an element on the page".to_string(),
            input_schema: InputShape::new().required(
                "selector",
                ParamKind::String,
                "CSS selector of the element to click",
            ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let ClickInput { selector } = parse_input("click", input)?;
        self.driver.click(&selector).await?;
        Ok(ToolOutput::success(format!(
            "Successfully clicked element with selector: {selector}"
        )))
    }
}
