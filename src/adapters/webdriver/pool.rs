//! Explicitly managed WebDriver server.
//!
//! A `DriverPool` is created once with [`DriverPool::start`], shared by every
//! validation in the process, and torn down with [`DriverPool::shutdown`].
//! When `driver_binary` is configured the pool owns the driver process;
//! otherwise it attaches to an already running server at `webdriver_url`.
//! Browser sessions themselves are never pooled: each call to
//! `open_session` starts a fresh one.

use crate::adapters::validator::{AutomationSession, SessionFactory};
use crate::adapters::webdriver::session::WebDriverSession;
use crate::infra::config::ValidatorConfig;
use crate::infra::error::{ValidationError, ValidationResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::Instant;

const READINESS_POLL: Duration = Duration::from_millis(250);

pub struct DriverPool {
    config: ValidatorConfig,
    endpoint: String,
    child: Mutex<Option<Child>>,
}

impl DriverPool {
    /// Spawn (or attach to) the driver and wait until it reports ready.
    pub async fn start(config: ValidatorConfig) -> ValidationResult<Self> {
        let (endpoint, child) = match &config.driver_binary {
            Some(binary) => {
                log::info!(
                    "Starting WebDriver {} on port {}",
                    binary.display(),
                    config.driver_port
                );
                let child = Command::new(binary)
                    .arg(format!("--port={}", config.driver_port))
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|e| {
                        ValidationError::AutomationFailure(format!(
                            "Failed to start {}: {e}",
                            binary.display()
                        ))
                    })?;
                (format!("http://127.0.0.1:{}", config.driver_port), Some(child))
            }
            None => (config.webdriver_url.trim_end_matches('/').to_string(), None),
        };

        let pool = Self {
            endpoint,
            child: Mutex::new(child),
            config,
        };
        pool.wait_until_ready().await?;
        log::info!("WebDriver ready at {}", pool.endpoint);
        Ok(pool)
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Stop the driver process if this pool started it.
    pub async fn shutdown(self) -> ValidationResult<()> {
        if let Some(mut child) = self.child.into_inner() {
            log::info!("Stopping WebDriver");
            child.kill().await.map_err(|e| {
                ValidationError::AutomationFailure(format!("Failed to stop WebDriver: {e}"))
            })?;
        }
        Ok(())
    }

    async fn wait_until_ready(&self) -> ValidationResult<()> {
        let client = reqwest::Client::builder()
            .timeout(READINESS_POLL * 4)
            .build()
            .map_err(|e| {
                ValidationError::AutomationFailure(format!("Failed to create HTTP client: {e}"))
            })?;
        let status_url = format!("{}/status", self.endpoint);
        let deadline = Instant::now() + self.config.page_load_timeout();

        loop {
            match client.get(&status_url).send().await {
                Ok(response) if response.status().is_success() => {
                    let ready = response
                        .json::<serde_json::Value>()
                        .await
                        .ok()
                        .and_then(|body| {
                            body.pointer("/value/ready")
                                .and_then(serde_json::Value::as_bool)
                        })
                        // Older drivers omit the flag
                        .unwrap_or(true);
                    if ready {
                        return Ok(());
                    }
                }
                Ok(response) => log::debug!("WebDriver status: {}", response.status()),
                Err(e) => log::debug!("WebDriver not reachable yet: {e}"),
            }

            if let Some(child) = self.child.lock().await.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(ValidationError::AutomationFailure(format!(
                        "WebDriver exited during startup: {status}"
                    )));
                }
            }
            if Instant::now() >= deadline {
                return Err(ValidationError::Timeout(format!(
                    "WebDriver at {} not ready within {:?}",
                    self.endpoint,
                    self.config.page_load_timeout()
                )));
            }
            tokio::time::sleep(READINESS_POLL).await;
        }
    }
}

#[async_trait]
impl SessionFactory for DriverPool {
    async fn open_session(&self) -> ValidationResult<Box<dyn AutomationSession>> {
        let session = WebDriverSession::connect(&self.endpoint, &self.config).await?;
        Ok(Box::new(session))
    }
}
