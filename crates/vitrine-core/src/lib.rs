pub mod catalog;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{NodeError, Result, VitrineError};
pub use types::*;
