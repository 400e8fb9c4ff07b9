//! HTTP inbound adapter exposing REST endpoints.

pub mod contests;
pub mod error;
pub mod health;
pub mod registrations;
pub mod schemas;
pub mod state;
pub mod teams;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
