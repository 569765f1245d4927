use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::fmt::Display;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::parser::PageParser;
use super::traits::SourceFeed;
use super::types::SourceConfig;
use crate::error::{ConfigError, DetailError, FetchError};
use crate::models::{ListingDescriptor, ListingDetail, Source};

const ACCEPT_COOKIES_JS: &str = r#"
    const button = document.querySelector('button[id*="accept"], button[id*="godkann"]');
    if (button) button.click();
"#;

fn session_error(e: impl Display) -> FetchError {
    FetchError::Session(format!("{:#}", e))
}

/// Headless Chrome instance shared by one source's pass.
///
/// Launched lazily. A broken instance is replaced through [`BrowserSession::renew`].
pub struct BrowserSession {
    headless: bool,
    browser: Mutex<Option<Browser>>,
}

impl BrowserSession {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            browser: Mutex::new(None),
        }
    }

    fn launch(headless: bool) -> Result<Browser, FetchError> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .build()
            .map_err(session_error)?;

        Browser::new(options).map_err(session_error)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Browser>>, FetchError> {
        self.browser
            .lock()
            .map_err(|_| FetchError::Session("browser lock poisoned".to_string()))
    }

    async fn current(&self) -> Result<Browser, FetchError> {
        if let Some(browser) = self.lock()?.as_ref() {
            return Ok(browser.clone());
        }

        let headless = self.headless;
        let browser = tokio::task::spawn_blocking(move || Self::launch(headless))
            .await
            .map_err(session_error)??;

        *self.lock()? = Some(browser.clone());
        Ok(browser)
    }

    /// Drop the current browser and launch a replacement.
    pub async fn renew(&self) -> Result<(), FetchError> {
        let stale = self.lock()?.take();
        let headless = self.headless;

        let browser = tokio::task::spawn_blocking(move || {
            drop(stale);
            Self::launch(headless)
        })
        .await
        .map_err(session_error)??;

        *self.lock()? = Some(browser);
        Ok(())
    }

    /// Load `url` in a fresh tab and return the rendered document.
    pub async fn page_html(&self, url: &str, settle: Duration) -> Result<String, FetchError> {
        let browser = self.current().await?;
        let url = url.to_string();

        tokio::task::spawn_blocking(move || render(&browser, &url, settle))
            .await
            .map_err(session_error)?
    }
}

/// Closes the tab when dropped, whichever way rendering ends.
struct OpenTab<T: CloseTab> {
    tab: Arc<T>,
    url: String,
}

trait CloseTab {
    fn close_tab(&self) -> anyhow::Result<()>;
}

impl CloseTab for Tab {
    fn close_tab(&self) -> anyhow::Result<()> {
        self.close(true).map(|_| ())
    }
}

impl<T: CloseTab> OpenTab<T> {
    fn new(tab: Arc<T>, url: &str) -> Self {
        Self {
            tab,
            url: url.to_string(),
        }
    }
}

impl<T: CloseTab> Deref for OpenTab<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.tab
    }
}

impl<T: CloseTab> Drop for OpenTab<T> {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close_tab() {
            warn!("Could not close tab for {}: {:#}", self.url, e);
        }
    }
}

fn render(browser: &Browser, url: &str, settle: Duration) -> Result<String, FetchError> {
    let navigation_error = |e: anyhow::Error| FetchError::Transport {
        url: url.to_string(),
        message: format!("{:#}", e),
    };

    let tab = OpenTab::new(browser.new_tab().map_err(session_error)?, url);
    tab.navigate_to(url).map_err(navigation_error)?;
    tab.wait_until_navigated().map_err(navigation_error)?;

    // Client-side rendering keeps going after the load event.
    thread::sleep(settle);

    if let Err(e) = tab.evaluate(ACCEPT_COOKIES_JS, false) {
        debug!("Cookie banner not handled on {}: {:#}", url, e);
    }

    let html = tab
        .evaluate("document.documentElement.outerHTML", false)
        .map_err(session_error)?
        .value
        .and_then(|value| value.as_str().map(str::to_string))
        .filter(|html| !html.is_empty())
        .ok_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "page has no HTML".to_string(),
        })?;

    debug!("Rendered {} bytes of HTML from {}", html.len(), url);
    Ok(html)
}

/// Feed for marketplaces that only render listings in a real browser
pub struct BrowserFeed {
    source: Source,
    search_url: String,
    settle: Duration,
    session: BrowserSession,
    parser: PageParser,
}

impl BrowserFeed {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source: Source::new(&config.name),
            search_url: config.search_url.clone(),
            settle: Duration::from_secs(config.settle_secs),
            session: BrowserSession::new(true),
            parser: PageParser::new(config)?,
        })
    }
}

#[async_trait]
impl SourceFeed for BrowserFeed {
    fn source(&self) -> &Source {
        &self.source
    }

    async fn fetch_short_listings(&self) -> Result<Vec<ListingDescriptor>, FetchError> {
        info!("Opening {} search page...", self.source);
        let html = self.session.page_html(&self.search_url, self.settle).await?;
        let descriptors = self.parser.parse_short_listings(&html);
        info!("Found {} listing cards on {}", descriptors.len(), self.source);
        Ok(descriptors)
    }

    async fn fetch_detail(&self, descriptor: &ListingDescriptor) -> Result<ListingDetail, DetailError> {
        let html = self.session.page_html(&descriptor.url, self.settle).await?;
        Ok(self.parser.parse_detail(&html)?)
    }

    async fn renew_session(&self) -> Result<(), FetchError> {
        warn!("Replacing browser session for {}", self.source);
        self.session.renew().await
    }
}
