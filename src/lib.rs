pub mod app;
pub mod config;
pub mod error;
pub mod fetch;
pub mod records;

pub use error::{AppError, Result};
