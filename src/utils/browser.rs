//! Rendered-page driver for providers without a query API.
//!
//! [`PageDriver`] is the capability the SSRN adapter needs from a browser.
//! [`WebDriverLauncher`] starts sessions against a W3C WebDriver endpoint
//! (chromedriver, geckodriver) over the regular [`Transport`]; tests inject
//! [`crate::sources::mock::MockLauncher`] instead.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::BrowserConfig;
use crate::sources::ProviderError;
use crate::utils::http::{HttpRequest, HttpResponse, Transport};

/// W3C key code for Enter
const ENTER_KEY: char = '\u{E007}';

/// W3C element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque handle to an element located on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    pub id: String,
}

/// A live browser session
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL
    async fn open(&mut self, url: &str) -> Result<(), ProviderError>;

    /// Type `text` into the first element matching `selector` and press Enter
    async fn submit_search(&mut self, selector: &str, text: &str) -> Result<(), ProviderError>;

    /// URL of the page currently displayed
    async fn current_url(&mut self) -> Result<String, ProviderError>;

    /// First element matching a CSS selector
    async fn find_element(&mut self, selector: &str) -> Result<Option<PageElement>, ProviderError>;

    /// Attribute value of an element
    async fn attribute(
        &mut self,
        element: &PageElement,
        name: &str,
    ) -> Result<Option<String>, ProviderError>;

    /// End the session
    async fn close(&mut self) -> Result<(), ProviderError>;
}

/// Starts browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync + std::fmt::Debug {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, ProviderError>;
}

/// Launches Chrome sessions through a WebDriver server
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    transport: Arc<dyn Transport>,
    endpoint: String,
    chrome_path: Option<String>,
    headless: bool,
}

impl WebDriverLauncher {
    pub fn new(transport: Arc<dyn Transport>, config: &BrowserConfig) -> Self {
        Self {
            transport,
            endpoint: config.webdriver_url.trim_end_matches('/').to_string(),
            chrome_path: config.chrome_exe_path.clone(),
            headless: config.headless,
        }
    }

    fn capabilities(&self, binary: &str) -> Value {
        let args: Vec<&str> = if self.headless {
            vec!["--headless=new", "--disable-gpu"]
        } else {
            Vec::new()
        };
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "binary": binary, "args": args }
                }
            }
        })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, ProviderError> {
        let binary = self
            .chrome_path
            .as_deref()
            .ok_or_else(|| ProviderError::missing_credential("ssrn", "browser.chrome_exe_path"))?;

        let url = format!("{}/session", self.endpoint);
        let response = self
            .transport
            .execute(HttpRequest::post_json(url, &self.capabilities(binary)))
            .await?;
        let value = webdriver_value(response)?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Browser("WebDriver did not return a session id".to_string()))?
            .to_string();

        tracing::debug!(session = %session_id, "Started WebDriver session");
        Ok(Box::new(WebDriverSession {
            transport: Arc::clone(&self.transport),
            base: format!("{}/session/{}", self.endpoint, session_id),
            closed: false,
        }))
    }
}

/// One WebDriver session
#[derive(Debug)]
pub struct WebDriverSession {
    transport: Arc<dyn Transport>,
    base: String,
    closed: bool,
}

impl WebDriverSession {
    async fn command(&self, request: HttpRequest) -> Result<Value, ProviderError> {
        let response = self.transport.execute(request).await?;
        webdriver_value(response)
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn open(&mut self, url: &str) -> Result<(), ProviderError> {
        let request = HttpRequest::post_json(format!("{}/url", self.base), &json!({ "url": url }));
        self.command(request).await.map(|_| ())
    }

    async fn submit_search(&mut self, selector: &str, text: &str) -> Result<(), ProviderError> {
        let element = self.find_element(selector).await?.ok_or_else(|| {
            ProviderError::Browser(format!("Search box '{}' not found", selector))
        })?;

        let keys = format!("{}{}", text, ENTER_KEY);
        let request = HttpRequest::post_json(
            format!("{}/element/{}/value", self.base, element.id),
            &json!({ "text": keys }),
        );
        self.command(request).await.map(|_| ())
    }

    async fn current_url(&mut self) -> Result<String, ProviderError> {
        let value = self.command(HttpRequest::get(format!("{}/url", self.base))).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Browser("Current URL is not a string".to_string()))
    }

    async fn find_element(&mut self, selector: &str) -> Result<Option<PageElement>, ProviderError> {
        let request = HttpRequest::post_json(
            format!("{}/element", self.base),
            &json!({ "using": "css selector", "value": selector }),
        );
        let response = self.transport.execute(request).await?;
        if response.is_not_found() {
            return Ok(None);
        }

        let value = webdriver_value(response)?;
        Ok(value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| PageElement { id: id.to_string() }))
    }

    async fn attribute(
        &mut self,
        element: &PageElement,
        name: &str,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/element/{}/attribute/{}", self.base, element.id, name);
        let value = self.command(HttpRequest::get(url)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn close(&mut self) -> Result<(), ProviderError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.command(HttpRequest::delete(self.base.clone())).await.map(|_| ())
    }
}

/// Unwrap the `value` member of a WebDriver reply, surfacing protocol errors
fn webdriver_value(response: HttpResponse) -> Result<Value, ProviderError> {
    let status = response.status;
    let mut body: Value = response.json()?;
    let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if !(200..300).contains(&status) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown WebDriver error");
        return Err(ProviderError::Browser(format!("{} ({})", message, status)));
    }
    Ok(value)
}
