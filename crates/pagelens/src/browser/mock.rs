// ABOUTME: Scripted in-memory page and browser for unit tests.
// ABOUTME: Selector answers can be scripted; anything unscripted is answered from the page HTML.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::http::query_html;
use crate::browser::{Browser, Page, QueryTarget};
use crate::error::PageError;

#[derive(Default)]
struct State {
    html: String,
    scripted: HashMap<String, Result<Option<String>, PageError>>,
    goto_error: Option<PageError>,
    goto_delay: Option<Duration>,
    html_error: Option<PageError>,
    failing_close: bool,
    navigated_to: Option<String>,
    waited: Option<Duration>,
    scrolled: bool,
    queries: HashMap<String, usize>,
}

/// A page whose behaviour is fixed up front. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct ScriptedPage {
    state: Arc<Mutex<State>>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(self, html: &str) -> Self {
        self.state.lock().unwrap().html = html.to_string();
        self
    }

    /// Answer `selector` with `value` regardless of the HTML.
    pub fn script(self, selector: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripted
            .insert(selector.to_string(), Ok(Some(value.to_string())));
        self
    }

    /// Make `selector` fail as if the driver threw.
    pub fn throwing(self, selector: &str) -> Self {
        self.state.lock().unwrap().scripted.insert(
            selector.to_string(),
            Err(PageError::Other(format!("failed to evaluate {selector}"))),
        );
        self
    }

    pub fn goto_fails(self, err: PageError) -> Self {
        self.state.lock().unwrap().goto_error = Some(err);
        self
    }

    pub fn goto_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().goto_delay = Some(delay);
        self
    }

    pub fn html_fails(self, err: PageError) -> Self {
        self.state.lock().unwrap().html_error = Some(err);
        self
    }

    pub fn failing_close(self) -> Self {
        self.state.lock().unwrap().failing_close = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closes.load(Ordering::SeqCst) > 0
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn query_count(&self, selector: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queries
            .get(selector)
            .copied()
            .unwrap_or(0)
    }

    pub fn waited(&self) -> Option<Duration> {
        self.state.lock().unwrap().waited
    }

    pub fn scrolled(&self) -> bool {
        self.state.lock().unwrap().scrolled
    }

    fn answer(
        &self,
        selector: &str,
        target: &QueryTarget,
        first_only: bool,
    ) -> Result<Vec<String>, PageError> {
        let mut state = self.state.lock().unwrap();
        *state.queries.entry(selector.to_string()).or_default() += 1;
        match state.scripted.get(selector) {
            Some(Ok(value)) => Ok(value.iter().cloned().collect()),
            Some(Err(err)) => Err(err.clone()),
            None => query_html(&state.html, selector, target, first_only),
        }
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn goto(&mut self, url: &str) -> Result<(), PageError> {
        let (delay, error) = {
            let mut state = self.state.lock().unwrap();
            state.navigated_to = Some(url.to_string());
            (state.goto_delay, state.goto_error.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn wait_for_scripts(&mut self, max_wait: Duration) -> Result<(), PageError> {
        self.state.lock().unwrap().waited = Some(max_wait);
        Ok(())
    }

    async fn scroll_to_load(&mut self) -> Result<(), PageError> {
        self.state.lock().unwrap().scrolled = true;
        Ok(())
    }

    async fn query(
        &self,
        selector: &str,
        target: &QueryTarget,
    ) -> Result<Option<String>, PageError> {
        self.answer(selector, target, true)
            .map(|values| values.into_iter().next())
    }

    async fn query_all(
        &self,
        selector: &str,
        target: &QueryTarget,
    ) -> Result<Vec<String>, PageError> {
        self.answer(selector, target, false)
    }

    async fn html(&self) -> Result<String, PageError> {
        let state = self.state.lock().unwrap();
        match &state.html_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.html.clone()),
        }
    }

    fn url(&self) -> Option<String> {
        self.state.lock().unwrap().navigated_to.clone()
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().unwrap().failing_close {
            Err(PageError::Other("target already gone".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Hands out clones of one scripted page, or fails to open one.
pub(crate) struct ScriptedBrowser {
    page: ScriptedPage,
    open_error: Option<PageError>,
}

impl ScriptedBrowser {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page,
            open_error: None,
        }
    }

    pub fn failing(err: PageError) -> Self {
        Self {
            page: ScriptedPage::new(),
            open_error: Some(err),
        }
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn new_page(&self) -> Result<Box<dyn Page>, PageError> {
        match &self.open_error {
            Some(err) => Err(err.clone()),
            None => Ok(Box::new(self.page.clone())),
        }
    }
}
