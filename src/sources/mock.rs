//! Canned transports and browsers for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::sources::ProviderError;
use crate::utils::{BrowserLauncher, HttpRequest, HttpResponse, PageDriver, PageElement, Transport};

/// A transport that answers from responses registered per URL.
///
/// Responses for one URL are served in registration order; the last one
/// keeps being served once the queue is down to it. Unregistered URLs fail
/// with a network error. Every executed request is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for an exact URL
    pub fn respond(&self, url: impl Into<String>, status: u16, body: impl Into<String>) {
        let mut guard = self.responses.lock().unwrap();
        guard
            .entry(url.into())
            .or_default()
            .push_back(HttpResponse::new(status, body));
    }

    /// Requests executed so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// URLs requested so far, in order
    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let mut guard = self.responses.lock().unwrap();
        let queue = guard
            .get_mut(&url)
            .ok_or_else(|| ProviderError::Network(format!("No mock response for {}", url)))?;

        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| ProviderError::Network(format!("No mock response for {}", url)))
    }
}

/// Shared record of what a [`MockBrowser`] was asked to do
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub opened: Vec<String>,
    pub searches: Vec<(String, String)>,
    pub closed: bool,
}

/// A scripted page driver.
///
/// `current_url` returns the configured results URL; `find_element` finds
/// only the configured selector, whose `href` is the configured link.
#[derive(Debug)]
pub struct MockBrowser {
    results_url: String,
    link_selector: String,
    link: Option<String>,
    fail_search: bool,
    log: Arc<Mutex<BrowserLog>>,
}

#[async_trait]
impl PageDriver for MockBrowser {
    async fn open(&mut self, url: &str) -> Result<(), ProviderError> {
        self.log.lock().unwrap().opened.push(url.to_string());
        Ok(())
    }

    async fn submit_search(&mut self, selector: &str, text: &str) -> Result<(), ProviderError> {
        if self.fail_search {
            return Err(ProviderError::Browser(format!("Search box '{}' not found", selector)));
        }
        self.log
            .lock()
            .unwrap()
            .searches
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, ProviderError> {
        Ok(self.results_url.clone())
    }

    async fn find_element(&mut self, selector: &str) -> Result<Option<PageElement>, ProviderError> {
        if selector == self.link_selector && self.link.is_some() {
            Ok(Some(PageElement { id: "link".to_string() }))
        } else {
            Ok(None)
        }
    }

    async fn attribute(
        &mut self,
        element: &PageElement,
        name: &str,
    ) -> Result<Option<String>, ProviderError> {
        if element.id == "link" && name == "href" {
            Ok(self.link.clone())
        } else {
            Ok(None)
        }
    }

    async fn close(&mut self) -> Result<(), ProviderError> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Launches [`MockBrowser`] sessions sharing one [`BrowserLog`]
#[derive(Debug, Clone)]
pub struct MockLauncher {
    results_url: String,
    link_selector: String,
    link: Option<String>,
    fail_search: bool,
    log: Arc<Mutex<BrowserLog>>,
}

impl MockLauncher {
    /// A launcher whose first search result links to `link`
    pub fn new(link_selector: impl Into<String>, link: Option<String>) -> Self {
        Self {
            results_url: "https://www.ssrn.com/index.cfm/en/results".to_string(),
            link_selector: link_selector.into(),
            link,
            fail_search: false,
            log: Arc::new(Mutex::new(BrowserLog::default())),
        }
    }

    /// Make `submit_search` fail
    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn results_url(&self) -> &str {
        &self.results_url
    }

    pub fn was_closed(&self) -> bool {
        self.log.lock().unwrap().closed
    }

    pub fn opened(&self) -> Vec<String> {
        self.log.lock().unwrap().opened.clone()
    }

    pub fn searches(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().searches.clone()
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, ProviderError> {
        Ok(Box::new(MockBrowser {
            results_url: self.results_url.clone(),
            link_selector: self.link_selector.clone(),
            link: self.link.clone(),
            fail_search: self.fail_search,
            log: Arc::clone(&self.log),
        }))
    }
}

/// A launcher that never starts a session
#[derive(Debug, Clone, Default)]
pub struct NoBrowser;

#[async_trait]
impl BrowserLauncher for NoBrowser {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, ProviderError> {
        Err(ProviderError::Browser("No browser available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_serves_in_order_then_repeats_last() {
        let transport = MockTransport::new();
        transport.respond("http://x/", 200, "one");
        transport.respond("http://x/", 200, "two");

        let body = |r: Result<HttpResponse, ProviderError>| r.unwrap().body;
        assert_eq!(body(transport.execute(HttpRequest::get("http://x/")).await), "one");
        assert_eq!(body(transport.execute(HttpRequest::get("http://x/")).await), "two");
        assert_eq!(body(transport.execute(HttpRequest::get("http://x/")).await), "two");
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unregistered_url_is_network_error() {
        let transport = MockTransport::new();
        let err = transport.execute(HttpRequest::get("http://nowhere/")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
        assert_eq!(transport.urls(), vec!["http://nowhere/"]);
    }
}
