pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod request;
pub mod shared;
pub mod version;

pub use config::Config;
pub use error::AppError;
pub use request::{execute_request, StatReport, StatRequest};
