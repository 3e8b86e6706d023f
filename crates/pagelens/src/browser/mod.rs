// ABOUTME: Page backend abstraction: Browser opens pages, Page navigates and answers selector queries.
// ABOUTME: PageGuard scopes one page per fetch and closes it on every exit path, including cancellation.

//! Page backends.
//!
//! The engine only talks to pages through the [`Page`] trait so the static
//! HTTP renderer and a real headless browser are interchangeable. Backends
//! normalise their driver failures into [`PageError`] before returning.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PageError;

pub mod http;
#[cfg(feature = "chromium")]
pub mod chromium;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpBrowser;
#[cfg(feature = "chromium")]
pub use chromium::ChromiumBrowser;

/// What to read from the first element a selector matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    /// Visible text content.
    Text,
    /// Inner HTML.
    InnerHtml,
    /// A named attribute.
    Attribute(String),
}

impl QueryTarget {
    pub fn attribute(name: impl Into<String>) -> Self {
        QueryTarget::Attribute(name.into())
    }
}

/// Opens fresh pages. Implementations are shared across concurrent fetches.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Open a blank page owned by the caller.
    async fn new_page(&self) -> Result<Box<dyn Page>, PageError>;
}

/// One page, used by a single fetch.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to `url` and wait for the initial document.
    async fn goto(&mut self, url: &str) -> Result<(), PageError>;

    /// Give client-side scripts up to `max_wait` to render content.
    async fn wait_for_scripts(&mut self, max_wait: Duration) -> Result<(), PageError>;

    /// Scroll through the document to trigger lazy loading.
    async fn scroll_to_load(&mut self) -> Result<(), PageError>;

    /// Read `target` from the first element matching `selector`.
    ///
    /// `Ok(None)` means no element matched. An invalid selector is an error.
    async fn query(&self, selector: &str, target: &QueryTarget)
        -> Result<Option<String>, PageError>;

    /// Read `target` from every element matching `selector`, in document order.
    async fn query_all(&self, selector: &str, target: &QueryTarget)
        -> Result<Vec<String>, PageError>;

    /// Serialized HTML of the current document.
    async fn html(&self) -> Result<String, PageError>;

    /// URL of the current document after redirects, once navigated.
    fn url(&self) -> Option<String>;

    /// Release the page. Must be safe to call once after any other failure.
    async fn close(&mut self) -> Result<(), PageError>;
}

/// Stand-in left behind once a guard has handed its page off for closing.
struct Detached;

#[async_trait]
impl Page for Detached {
    async fn goto(&mut self, _url: &str) -> Result<(), PageError> {
        Err(detached())
    }

    async fn wait_for_scripts(&mut self, _max_wait: Duration) -> Result<(), PageError> {
        Err(detached())
    }

    async fn scroll_to_load(&mut self) -> Result<(), PageError> {
        Err(detached())
    }

    async fn query(&self, _selector: &str, _target: &QueryTarget) -> Result<Option<String>, PageError> {
        Err(detached())
    }

    async fn query_all(&self, _selector: &str, _target: &QueryTarget) -> Result<Vec<String>, PageError> {
        Err(detached())
    }

    async fn html(&self) -> Result<String, PageError> {
        Err(detached())
    }

    fn url(&self) -> Option<String> {
        None
    }

    async fn close(&mut self) -> Result<(), PageError> {
        Ok(())
    }
}

fn detached() -> PageError {
    PageError::Other("page already closed".to_string())
}

/// Scoped ownership of one page for one fetch.
///
/// Prefer [`PageGuard::close`], which awaits the backend's close and reports
/// failures. If the guard is dropped without it (an early return, a panic, or
/// the fetch future being cancelled), `Drop` spawns the close onto the tokio
/// runtime the guard was created in.
pub struct PageGuard {
    page: Box<dyn Page>,
    url: String,
    closed: bool,
    runtime: Option<tokio::runtime::Handle>,
}

impl PageGuard {
    pub fn new(page: Box<dyn Page>, url: impl Into<String>) -> Self {
        Self {
            page,
            url: url.into(),
            closed: false,
            runtime: tokio::runtime::Handle::try_current().ok(),
        }
    }

    /// Close the page, consuming the guard.
    pub async fn close(mut self) -> Result<(), PageError> {
        self.closed = true;
        let mut page = std::mem::replace(&mut self.page, Box::new(Detached));
        match page.close().await {
            Ok(()) => {
                tracing::debug!(url = %self.url, "page closed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(url = %self.url, error = %err, "failed to close page");
                Err(err)
            }
        }
    }
}

impl Deref for PageGuard {
    type Target = dyn Page;

    fn deref(&self) -> &Self::Target {
        self.page.as_ref()
    }
}

impl DerefMut for PageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.page.as_mut()
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let mut page = std::mem::replace(&mut self.page, Box::new(Detached));
        let url = std::mem::take(&mut self.url);
        match &self.runtime {
            Some(handle) => {
                handle.spawn(async move {
                    match page.close().await {
                        Ok(()) => tracing::trace!(url = %url, "page closed on drop"),
                        Err(err) => {
                            tracing::warn!(url = %url, error = %err, "page close on drop failed")
                        }
                    }
                });
            }
            None => tracing::warn!(url = %url, "page dropped outside a runtime; not closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedPage;
    use super::*;

    async fn wait_until_closed(page: &ScriptedPage) {
        for _ in 0..100 {
            if page.is_closed() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn explicit_close_closes_once() {
        let page = ScriptedPage::new();
        let guard = PageGuard::new(Box::new(page.clone()), "https://example.com");
        guard.close().await.unwrap();
        assert!(page.is_closed());
        assert_eq!(page.close_count(), 1);
    }

    #[tokio::test]
    async fn drop_schedules_close() {
        let page = ScriptedPage::new();
        {
            let _guard = PageGuard::new(Box::new(page.clone()), "https://example.com");
        }
        wait_until_closed(&page).await;
        assert!(page.is_closed());
        assert_eq!(page.close_count(), 1);
    }

    #[tokio::test]
    async fn cancelled_fetch_still_closes() {
        let page = ScriptedPage::new();
        let handle = {
            let page = page.clone();
            tokio::spawn(async move {
                let _guard = PageGuard::new(Box::new(page), "https://example.com");
                std::future::pending::<()>().await;
            })
        };
        tokio::task::yield_now().await;
        handle.abort();
        let _ = handle.await;
        wait_until_closed(&page).await;
        assert!(page.is_closed());
    }

    #[tokio::test]
    async fn guard_derefs_to_page() {
        let page = ScriptedPage::new().with_html("<html><body>hi</body></html>");
        let mut guard = PageGuard::new(Box::new(page.clone()), "https://example.com");
        guard.goto("https://example.com").await.unwrap();
        assert_eq!(guard.html().await.unwrap(), "<html><body>hi</body></html>");
        guard.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_failure_is_reported() {
        let page = ScriptedPage::new().failing_close();
        let guard = PageGuard::new(Box::new(page.clone()), "https://example.com");
        assert!(guard.close().await.is_err());
        assert_eq!(page.close_count(), 1);
    }
}
