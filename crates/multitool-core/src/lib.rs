pub mod config;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod params;
pub mod paths;
pub mod privilege;

pub use error::{MultiToolError, Result};
