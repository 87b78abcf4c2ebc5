//! The request driver.
//!
//! Takes a [`StatRequest`] assembled from the command line, runs it through
//! the dial policy, TLS and hyper, and returns a [`StatReport`] for display.

mod executor;
mod types;

pub use executor::{execute_request, execute_with};
pub use types::{version_to_string, HopReport, StatReport, StatRequest};
