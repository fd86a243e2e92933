// src/surface/webdriver.rs

//! [`RenderSurface`] over the W3C WebDriver HTTP protocol.
//!
//! Works against any conforming driver (chromedriver, geckodriver) listening
//! on `surface.webdriver_url`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::SurfaceConfig;
use crate::surface::RenderSurface;

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// A live WebDriver browser session.
pub struct WebDriverSurface {
    client: Client,
    base_url: String,
    session_id: String,
    closed: AtomicBool,
}

impl WebDriverSurface {
    /// Open a new browser session.
    pub async fn connect(config: &SurfaceConfig) -> Result<Self> {
        let base_url = url::Url::parse(&config.webdriver_url)?
            .as_str()
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder()
            .timeout(config.page_timeout() + Duration::from_secs(30))
            .build()?;

        log::info!(
            "Starting {} session via {} (headless={})",
            config.browser,
            base_url,
            config.headless
        );

        let response = client
            .post(format!("{base_url}/session"))
            .json(&json!({ "capabilities": { "alwaysMatch": Self::capabilities(config) } }))
            .send()
            .await?;
        let value = Self::unwrap_value("new session", response.json().await?)?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::surface("new session", "response has no sessionId"))?
            .to_string();

        let surface = Self {
            client,
            base_url,
            session_id,
            closed: AtomicBool::new(false),
        };

        surface
            .command(
                Method::POST,
                "timeouts",
                Some(json!({
                    "pageLoad": config.page_timeout().as_millis() as u64,
                    "script": config.page_timeout().as_millis() as u64,
                })),
            )
            .await?;
        surface
            .command(
                Method::POST,
                "window/rect",
                Some(json!({ "width": config.window_width, "height": config.window_height })),
            )
            .await?;

        log::info!("Session {} ready", surface.session_id);
        Ok(surface)
    }

    fn capabilities(config: &SurfaceConfig) -> Value {
        match config.browser.as_str() {
            "firefox" => {
                let mut args = vec![
                    "-width".to_string(),
                    config.window_width.to_string(),
                    "-height".to_string(),
                    config.window_height.to_string(),
                ];
                if config.headless {
                    args.push("-headless".to_string());
                }
                json!({
                    "browserName": "firefox",
                    "acceptInsecureCerts": true,
                    "moz:firefoxOptions": {
                        "args": args,
                        "prefs": { "general.useragent.override": config.user_agent },
                    },
                })
            }
            browser => {
                let mut args = vec![
                    format!("--user-agent={}", config.user_agent),
                    format!("--window-size={},{}", config.window_width, config.window_height),
                    "--disable-blink-features=AutomationControlled".to_string(),
                    "--disable-dev-shm-usage".to_string(),
                    "--no-sandbox".to_string(),
                ];
                if config.headless {
                    args.push("--headless=new".to_string());
                }
                json!({
                    "browserName": browser,
                    "acceptInsecureCerts": true,
                    "goog:chromeOptions": { "args": args },
                })
            }
        }
    }

    /// Extract `value` from a WebDriver response, mapping protocol errors.
    fn unwrap_value(operation: &str, body: Value) -> Result<Value> {
        let value = body.get("value").cloned().unwrap_or(Value::Null);

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if error == "timeout" || error == "script timeout" {
                return Err(AppError::timeout(operation, 0));
            }
            return Err(AppError::surface(operation, format!("{error}: {message}")));
        }
        Ok(value)
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}/{}", self.base_url, self.session_id, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::surface(path, e))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::surface(path, e))?;
        Self::unwrap_value(path, body)
    }

    async fn find_element(&self, selector: &str) -> Result<String> {
        let value = self
            .command(
                Method::POST,
                "element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::surface("element", format!("no reference for {selector}")))
    }
}

#[async_trait]
impl RenderSurface for WebDriverSurface {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.command(
            Method::POST,
            "timeouts",
            Some(json!({ "pageLoad": timeout.as_millis() as u64 })),
        )
        .await?;

        match self
            .command(Method::POST, "url", Some(json!({ "url": url })))
            .await
        {
            Err(AppError::Timeout { .. }) => {
                Err(AppError::timeout(format!("page {url}"), timeout.as_secs()))
            }
            other => other.map(|_| ()),
        }
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let element = self.find_element(selector).await?;
        self.command(
            Method::POST,
            &format!("element/{element}/clear"),
            Some(json!({})),
        )
        .await?;
        self.command(
            Method::POST,
            &format!("element/{element}/value"),
            Some(json!({ "text": value })),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.find_element(selector).await?;
        self.command(
            Method::POST,
            &format!("element/{element}/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn evaluate_script(&self, script: &str) -> Result<Value> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn current_content(&self) -> Result<String> {
        let value = self.command(Method::GET, "source", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::surface("source", "page source is not a string"))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        let response = self.client.delete(&url).send().await?;
        Self::unwrap_value("delete session", response.json().await?)?;
        Ok(())
    }
}
