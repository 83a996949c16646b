pub mod config;
pub mod error;
pub mod types;
pub mod url;

pub use config::AppConfig;
pub use error::{CrawlError, InvalidUrl, SkipReason};
pub use types::*;
pub use url::{CanonicalUrl, HostKey};
