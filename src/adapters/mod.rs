//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - The remote validation authority, driven through a browser session
//! - WebDriver process management and sessions

pub mod browser_validator;
pub mod validator;
pub mod webdriver;

pub use browser_validator::BrowserSignatureValidator;
pub use validator::{AutomationSession, RemoteSignatureValidator, SessionFactory};
pub use webdriver::{DriverPool, WebDriverSession};
