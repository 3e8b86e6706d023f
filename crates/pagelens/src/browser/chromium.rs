// ABOUTME: Headless Chromium page backend over the DevTools protocol (cargo feature `chromium`).
// ABOUTME: Runs page scripts, waits for rendered content, scrolls for lazy loading, queries via evaluate.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use serde::Deserialize;

use crate::browser::{Browser, Page, QueryTarget};
use crate::error::PageError;
use crate::options::EngineOptions;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const SCROLL_PAUSE: Duration = Duration::from_millis(300);
const MAX_SCROLL_STEPS: usize = 20;

/// A launched headless Chromium shared by all pages it opens.
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    handler: tokio::task::JoinHandle<()>,
    timeout: Duration,
}

impl ChromiumBrowser {
    /// Launch a headless browser configured from `opts`.
    pub async fn launch(opts: &EngineOptions) -> Result<Self, PageError> {
        let user_agent = format!("--user-agent={}", opts.user_agent);
        let config = BrowserConfig::builder()
            .request_timeout(opts.navigation_timeout)
            .args(vec![
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--no-first-run",
                "--disable-extensions",
                user_agent.as_str(),
            ])
            .build()
            .map_err(|e| PageError::other(format!("browser config error: {e}")))?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| PageError::other(format!("failed to launch browser: {e}")))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "cdp handler event error");
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            timeout: opts.navigation_timeout,
        })
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn new_page(&self) -> Result<Box<dyn Page>, PageError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| map_cdp_error(e, self.timeout))?;
        Ok(Box::new(ChromiumPage {
            page: Some(page),
            final_url: None,
            timeout: self.timeout,
        }))
    }
}

/// One browser tab.
pub struct ChromiumPage {
    page: Option<chromiumoxide::Page>,
    final_url: Option<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct QueryResult {
    values: Vec<Option<String>>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&chromiumoxide::Page, PageError> {
        self.page
            .as_ref()
            .ok_or_else(|| PageError::Other("page already closed".to_string()))
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, PageError> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| map_cdp_error(e, self.timeout))?
            .into_value()
            .map_err(|e| PageError::Extraction(format!("unexpected script result: {e}")))
    }

    async fn run_query(
        &self,
        selector: &str,
        target: &QueryTarget,
        first_only: bool,
    ) -> Result<Vec<Option<String>>, PageError> {
        let selector = serde_json::to_string(selector).map_err(PageError::other)?;
        let read = match target {
            QueryTarget::Text => "el.innerText ?? el.textContent".to_string(),
            QueryTarget::InnerHtml => "el.innerHTML".to_string(),
            QueryTarget::Attribute(name) => {
                let name = serde_json::to_string(name).map_err(PageError::other)?;
                format!("el.getAttribute({name})")
            }
        };
        let pick = if first_only {
            format!("[document.querySelector({selector})].filter(Boolean)")
        } else {
            format!("Array.from(document.querySelectorAll({selector}))")
        };
        let script = format!("(() => ({{ values: {pick}.map((el) => {read}) }}))()");
        let result: QueryResult = self.eval(script).await?;
        Ok(result.values)
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&mut self, url: &str) -> Result<(), PageError> {
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|e| map_cdp_error(e, self.timeout))?;
        let final_url = page
            .url()
            .await
            .map_err(|e| map_cdp_error(e, self.timeout))?;
        self.final_url = final_url.or_else(|| Some(url.to_string()));
        Ok(())
    }

    async fn wait_for_scripts(&mut self, max_wait: Duration) -> Result<(), PageError> {
        let deadline = tokio::time::Instant::now() + max_wait;
        let mut last_len: Option<u64> = None;
        while tokio::time::Instant::now() < deadline {
            let (ready, len): (bool, u64) = self
                .eval(
                    "[document.readyState === 'complete', document.body ? document.body.innerText.length : 0]"
                        .to_string(),
                )
                .await?;
            if ready && len > 0 && last_len == Some(len) {
                break;
            }
            last_len = Some(len);
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn scroll_to_load(&mut self) -> Result<(), PageError> {
        for _ in 0..MAX_SCROLL_STEPS {
            let at_bottom: bool = self
                .eval(
                    "window.scrollBy(0, window.innerHeight); \
                     (window.innerHeight + window.scrollY) >= document.body.scrollHeight"
                        .to_string(),
                )
                .await?;
            tokio::time::sleep(SCROLL_PAUSE).await;
            if at_bottom {
                break;
            }
        }
        let _: bool = self
            .eval("window.scrollTo(0, 0); true".to_string())
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        selector: &str,
        target: &QueryTarget,
    ) -> Result<Option<String>, PageError> {
        let values = self.run_query(selector, target, true).await?;
        Ok(values.into_iter().next().flatten().map(|v| v.trim().to_string()))
    }

    async fn query_all(
        &self,
        selector: &str,
        target: &QueryTarget,
    ) -> Result<Vec<String>, PageError> {
        let values = self.run_query(selector, target, false).await?;
        Ok(values
            .into_iter()
            .flatten()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect())
    }

    async fn html(&self) -> Result<String, PageError> {
        self.page()?
            .content()
            .await
            .map_err(|e| map_cdp_error(e, self.timeout))
    }

    fn url(&self) -> Option<String> {
        self.final_url.clone()
    }

    async fn close(&mut self) -> Result<(), PageError> {
        match self.page.take() {
            Some(page) => page.close().await.map_err(|e| map_cdp_error(e, self.timeout)),
            None => Ok(()),
        }
    }
}

/// DevTools failures are mostly message-only; the classifier reads `Other` textually.
fn map_cdp_error(err: CdpError, timeout: Duration) -> PageError {
    match err {
        CdpError::Timeout => PageError::Timeout(timeout),
        other => PageError::other(other),
    }
}
