//! OmniFiler Core Logic
//!
//! This crate contains:
//! - The browsing engine (navigation, previews, remote sessions)
//! - Navigation history
//! - Configuration
//! - Error types
//! - The callback interface implemented by front-ends

pub mod browser;
pub mod config;
pub mod connection;
pub mod error;
pub mod history;
pub mod job;
pub mod navigation;
pub mod preview;
pub mod view;

#[cfg(test)]
mod testing;

pub use browser::{Browser, Phase};
pub use config::{AppConfig, GeneralConfig, HistoryConfig, PreviewConfig, RemoteConfig, RuntimeConfig};
pub use connection::ConnectionState;
pub use error::BrowseError;
pub use history::HistoryStack;
pub use job::{JobKind, JobSlot, JobToken, Transition};
pub use navigation::NavigationState;
pub use view::{Affordance, PreviewImage, View};
