//! WebDriver transport for browser-driven validation.

pub mod pool;
pub mod session;

pub use pool::DriverPool;
pub use session::WebDriverSession;
