// ABOUTME: Static page backend: fetches HTML over HTTP with SSRF protection and charset decoding.
// ABOUTME: Answers selector queries by parsing the fetched document with dom_query; runs no scripts.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dom_query::{Document, Matcher};
use futures::StreamExt;
use ipnet::IpNet;
use once_cell::sync::Lazy;

use crate::browser::{Browser, Page, QueryTarget};
use crate::error::PageError;
use crate::options::EngineOptions;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

static PRIVATE_NETS: Lazy<Vec<IpNet>> = Lazy::new(|| {
    [
        // RFC1918
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        // loopback, link-local, "this network"
        "127.0.0.0/8",
        "169.254.0.0/16",
        "0.0.0.0/8",
        // carrier-grade NAT
        "100.64.0.0/10",
        "::1/128",
        "fc00::/7",
        "fe80::/10",
    ]
    .iter()
    .filter_map(|net| net.parse().ok())
    .collect()
});

/// Check if an IP address is in a private/reserved range.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are checked as the IPv4 address.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    let addr = match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(*addr, IpAddr::V4),
        IpAddr::V4(_) => *addr,
    };
    PRIVATE_NETS.iter().any(|net| net.contains(&addr))
}

#[derive(Debug, Clone)]
struct HttpSettings {
    headers: HashMap<String, String>,
    allow_private_networks: bool,
    max_content_length: usize,
    timeout: Duration,
}

/// Browser backed by plain HTTP requests.
///
/// Suitable for server-rendered pages. Script waits and scrolling are no-ops,
/// so sites that render client-side yield whatever the server sent.
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    client: reqwest::Client,
    settings: Arc<HttpSettings>,
}

impl HttpBrowser {
    /// Build a backend with its own HTTP client configured from `opts`.
    pub fn new(opts: &EngineOptions) -> Result<Self, PageError> {
        let client = match &opts.http_client {
            Some(client) => client.clone(),
            None => build_client(opts)?,
        };
        Ok(Self::with_client(client, opts))
    }

    /// Use an existing client; request policy still comes from `opts`.
    pub fn with_client(client: reqwest::Client, opts: &EngineOptions) -> Self {
        Self {
            client,
            settings: Arc::new(HttpSettings {
                headers: opts.headers.clone(),
                allow_private_networks: opts.allow_private_networks,
                max_content_length: opts.max_content_length,
                timeout: opts.navigation_timeout,
            }),
        }
    }
}

fn build_client(opts: &EngineOptions) -> Result<reqwest::Client, PageError> {
    let allow_private = opts.allow_private_networks;
    let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= 10 {
            return attempt.error("too many redirects");
        }
        if !allow_private {
            let blocked = match attempt.url().host_str() {
                Some(host) => match host.trim_matches(['[', ']']).parse::<IpAddr>() {
                    Ok(ip) => is_private_ip(&ip),
                    // Hostnames are re-checked after the response arrives.
                    Err(_) => false,
                },
                None => false,
            };
            if blocked {
                return attempt.error("redirect to private IP blocked");
            }
        }
        attempt.follow()
    });

    reqwest::Client::builder()
        .redirect(redirect_policy)
        .user_agent(&opts.user_agent)
        .timeout(opts.navigation_timeout)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| PageError::other(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl Browser for HttpBrowser {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn new_page(&self) -> Result<Box<dyn Page>, PageError> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            settings: Arc::clone(&self.settings),
            loaded: None,
        }))
    }
}

/// One fetched document.
///
/// The HTML is parsed once on navigation. dom_query's `atomic` feature makes
/// the tree `Send`; the mutex makes the page `Sync` for `&self` queries.
pub struct HttpPage {
    client: reqwest::Client,
    settings: Arc<HttpSettings>,
    loaded: Option<Loaded>,
}

struct Loaded {
    html: String,
    document: Mutex<Document>,
    final_url: String,
}

impl HttpPage {
    fn loaded(&self) -> Result<&Loaded, PageError> {
        self.loaded
            .as_ref()
            .ok_or_else(|| PageError::Navigation("page has not been navigated".to_string()))
    }

    fn run_query(
        &self,
        selector: &str,
        target: &QueryTarget,
        first_only: bool,
    ) -> Result<Vec<String>, PageError> {
        let document = self
            .loaded()?
            .document
            .lock()
            .map_err(|_| PageError::other("document lock poisoned"))?;
        query_document(&document, selector, target, first_only)
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &str) -> Result<(), PageError> {
        let fetched = fetch(&self.client, url, &self.settings).await?;
        tracing::debug!(
            url,
            final_url = %fetched.final_url,
            bytes = fetched.body.len(),
            "fetched document"
        );
        let html = decode_body(&fetched.body, fetched.content_type.as_deref());
        let document = Mutex::new(Document::from(html.as_str()));
        self.loaded = Some(Loaded {
            html,
            document,
            final_url: fetched.final_url,
        });
        Ok(())
    }

    async fn wait_for_scripts(&mut self, _max_wait: Duration) -> Result<(), PageError> {
        Ok(())
    }

    async fn scroll_to_load(&mut self) -> Result<(), PageError> {
        Ok(())
    }

    async fn query(
        &self,
        selector: &str,
        target: &QueryTarget,
    ) -> Result<Option<String>, PageError> {
        self.run_query(selector, target, true)
            .map(|values| values.into_iter().next())
    }

    async fn query_all(
        &self,
        selector: &str,
        target: &QueryTarget,
    ) -> Result<Vec<String>, PageError> {
        self.run_query(selector, target, false)
    }

    async fn html(&self) -> Result<String, PageError> {
        self.loaded().map(|loaded| loaded.html.clone())
    }

    fn url(&self) -> Option<String> {
        self.loaded.as_ref().map(|loaded| loaded.final_url.clone())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.loaded = None;
        Ok(())
    }
}

/// Parse `html` and run one selector against it.
#[cfg(test)]
pub(crate) fn query_html(
    html: &str,
    selector: &str,
    target: &QueryTarget,
    first_only: bool,
) -> Result<Vec<String>, PageError> {
    query_document(&Document::from(html), selector, target, first_only)
}

/// Run `selector` against a parsed document.
///
/// With `first_only` the value of the first matching element is returned even
/// when empty; otherwise every non-empty value is returned.
fn query_document(
    doc: &Document,
    selector: &str,
    target: &QueryTarget,
    first_only: bool,
) -> Result<Vec<String>, PageError> {
    let matcher = Matcher::new(selector)
        .map_err(|_| PageError::Extraction(format!("invalid selector {selector:?}")))?;
    let selection = doc.select_matcher(&matcher);

    let mut values = Vec::new();
    for el in selection.iter() {
        let value = match target {
            QueryTarget::Text => Some(normalize_whitespace(&el.text())),
            QueryTarget::InnerHtml => Some(el.inner_html().to_string()),
            QueryTarget::Attribute(name) => el.attr(name).map(|v| v.trim().to_string()),
        };
        if first_only {
            return Ok(value.into_iter().collect());
        }
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            values.push(value);
        }
    }
    Ok(values)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct Fetched {
    final_url: String,
    content_type: Option<String>,
    body: Bytes,
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
    settings: &HttpSettings,
) -> Result<Fetched, PageError> {
    if url.trim().is_empty() {
        return Err(PageError::InvalidUrl("empty URL".to_string()));
    }
    let parsed = url::Url::parse(url).map_err(|e| PageError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PageError::InvalidUrl(format!(
            "{url}: scheme must be http or https"
        )));
    }

    if !settings.allow_private_networks {
        check_public(&parsed).await?;
    }

    let mut request = client.get(parsed.as_str());
    for (key, value) in &settings.headers {
        request = request.header(key, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| map_reqwest_error(e, settings.timeout))?;

    // Redirects to hostnames are resolved here; literal IPs were refused by the policy.
    if !settings.allow_private_networks {
        check_public(response.url()).await?;
    }

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(PageError::Http { status });
    }

    if let Some(len) = response.content_length() {
        if len > settings.max_content_length as u64 {
            return Err(too_large(settings.max_content_length));
        }
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    // Servers may omit or understate Content-Length; enforce the limit while streaming.
    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| map_reqwest_error(e, settings.timeout))?;
        if body.len() + chunk.len() > settings.max_content_length {
            return Err(too_large(settings.max_content_length));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(Fetched {
        final_url,
        content_type,
        body: body.freeze(),
    })
}

fn too_large(limit: usize) -> PageError {
    PageError::Other(format!("response body exceeds {limit} bytes"))
}

/// Refuse hosts that are, or resolve to, private addresses.
async fn check_public(url: &url::Url) -> Result<(), PageError> {
    let Some(host) = url.host_str() else {
        return Err(PageError::InvalidUrl(format!("{url}: missing host")));
    };
    let host = host.trim_matches(['[', ']']);
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(PageError::Blocked(format!("{ip} is a private address")));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| PageError::Network(format!("ERR_NAME_NOT_RESOLVED: {host}: {e}")))?;
    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(PageError::Blocked(format!(
                "{host} resolves to private address {}",
                addr.ip()
            )));
        }
    }
    Ok(())
}

/// Map a reqwest failure onto the page error taxonomy.
fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> PageError {
    if err.is_timeout() {
        return PageError::Timeout(timeout);
    }
    let (redirect, connect, body) = (
        err.is_redirect(),
        err.is_connect(),
        err.is_body() || err.is_decode(),
    );
    // Alternate formatting keeps the source chain, where the redirect policy's reason lives.
    let detail = format!("{:#}", anyhow::Error::new(err));
    if redirect {
        if detail.contains("private") {
            PageError::Blocked(detail)
        } else {
            PageError::Navigation(detail)
        }
    } else if connect {
        PageError::Network(format!("ERR_CONNECTION_FAILED: {detail}"))
    } else if body {
        PageError::Network(format!("ERR_CONTENT_DECODING_FAILED: {detail}"))
    } else {
        PageError::Network(format!("ERR_FAILED: {detail}"))
    }
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(encoding) = content_type
        .and_then(extract_charset)
        .and_then(|charset| encoding_rs::Encoding::for_label(charset.as_bytes()))
    {
        let (decoded, _, _) = encoding.decode(body);
        return decoded.into_owned();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    content_type.to_lowercase().split(';').find_map(|part| {
        part.trim()
            .strip_prefix("charset=")
            .map(|charset| charset.trim_matches('"').trim_matches('\'').to_string())
    })
}
