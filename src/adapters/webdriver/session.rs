//! `AutomationSession` backed by a WebDriver browser session.

use crate::adapters::validator::AutomationSession;
use crate::infra::config::ValidatorConfig;
use crate::infra::error::{ValidationError, ValidationResult};
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

pub struct WebDriverSession {
    client: Client,
    page_load_timeout: Duration,
    upload_wait: Duration,
}

impl WebDriverSession {
    /// Start a new browser through the WebDriver server at `endpoint`.
    pub async fn connect(endpoint: &str, config: &ValidatorConfig) -> ValidationResult<Self> {
        let mut args = config.browser_args.clone();
        if config.headless && !args.iter().any(|a| a.starts_with("--headless")) {
            args.push("--headless=new".to_string());
        }

        let mut capabilities = serde_json::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        capabilities.insert("pageLoadStrategy".to_string(), json!("eager"));

        log::debug!("Opening WebDriver session at {endpoint}");
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(endpoint)
            .await?;

        Ok(Self {
            client,
            page_load_timeout: config.page_load_timeout(),
            upload_wait: config.upload_wait(),
        })
    }
}

#[async_trait]
impl AutomationSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> ValidationResult<()> {
        tokio::time::timeout(self.page_load_timeout, self.client.goto(url))
            .await
            .map_err(|_| {
                ValidationError::Timeout(format!(
                    "page load of {url} exceeded {:?}",
                    self.page_load_timeout
                ))
            })??;
        Ok(())
    }

    async fn upload(&mut self, input_selector: &str, file: &Path) -> ValidationResult<()> {
        let input = self
            .client
            .wait()
            .at_most(self.upload_wait)
            .for_element(Locator::Css(input_selector))
            .await
            .map_err(|e| match e {
                CmdError::WaitTimeout => ValidationError::Timeout(format!(
                    "file input '{input_selector}' not found within {:?}",
                    self.upload_wait
                )),
                other => ValidationError::from(other),
            })?;
        input.send_keys(&file.to_string_lossy()).await?;
        log::debug!("Uploaded {}", file.display());
        Ok(())
    }

    async fn results_markup(
        &mut self,
        container_selector: &str,
    ) -> ValidationResult<Option<String>> {
        let containers = self
            .client
            .find_all(Locator::Css(container_selector))
            .await?;
        match containers.into_iter().next() {
            Some(container) => Ok(Some(container.html(false).await?)),
            None => Ok(None),
        }
    }

    async fn close(self: Box<Self>) -> ValidationResult<()> {
        self.client.close().await?;
        log::debug!("WebDriver session closed");
        Ok(())
    }
}
