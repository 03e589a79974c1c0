use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser as Chrome, LaunchOptions, Tab};
use tracing::info;

use super::Browser;
use crate::config::CrawlConfig;

const RESOURCE_LOG_JS: &str =
    "JSON.stringify(performance.getEntriesByType('resource').map(e => e.name))";

/// Headless Chrome with a single tab. The Chrome process is killed when this is dropped.
pub struct ChromeBrowser {
    _chrome: Chrome,
    tab: Arc<Tab>,
}

impl ChromeBrowser {
    pub fn launch(cfg: &CrawlConfig) -> Result<Self> {
        let options = launch_options(cfg)?;
        let chrome = Chrome::new(options).context("Failed to launch Chrome")?;
        let tab = chrome.new_tab().context("Failed to open Chrome tab")?;
        tab.set_user_agent(&cfg.user_agent, Some("ko-KR,ko;q=0.9"), None)
            .context("Failed to set user agent")?;
        info!("Chrome session started");

        Ok(ChromeBrowser {
            _chrome: chrome,
            tab,
        })
    }

    /// headless_chrome calls block, so each one runs on the blocking pool.
    async fn on_tab<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| anyhow!("Browser task panicked: {}", e))?
    }
}

fn launch_options(cfg: &CrawlConfig) -> Result<LaunchOptions<'static>> {
    LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .window_size(Some((1920, 1080)))
        .idle_browser_timeout(Duration::from_secs(cfg.browser_idle_timeout_secs))
        .args(vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
        ])
        .build()
        .map_err(|e| anyhow!("Invalid Chrome launch options: {}", e))
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.on_tab(move |tab| {
            tab.navigate_to(&url)
                .with_context(|| format!("Navigation to {} failed", url))?
                .wait_until_navigated()
                .with_context(|| format!("Page load of {} failed", url))?;
            Ok(())
        })
        .await
    }

    async fn page_source(&self) -> Result<String> {
        self.on_tab(|tab| tab.get_content()).await
    }

    async fn network_log(&self) -> Result<Vec<String>> {
        let raw = self.execute(RESOURCE_LOG_JS).await?;
        let Some(json) = raw.as_str() else {
            return Ok(Vec::new());
        };
        serde_json::from_str(json).context("Malformed resource log")
    }

    async fn execute(&self, script: &str) -> Result<serde_json::Value> {
        let script = script.to_string();
        self.on_tab(move |tab| {
            let object = tab.evaluate(&script, false)?;
            Ok(object.value.unwrap_or(serde_json::Value::Null))
        })
        .await
    }

    async fn frame_source(&self, frame_selector: &str) -> Result<Option<String>> {
        let selector = serde_json::to_string(frame_selector)?;
        let script = format!(
            "(() => {{ const f = document.querySelector({}); \
             try {{ return f && f.contentDocument ? f.contentDocument.documentElement.outerHTML : null; }} \
             catch (e) {{ return null; }} }})()",
            selector
        );
        let value = self.execute(&script).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }
}
