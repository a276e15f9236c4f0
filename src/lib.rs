//! Trademore offline runtime
//!
//! The offline cache & sync controller for the Trademore client portal, its
//! SQLite-backed stores and HTTP transport, and the password validation
//! engine used by the account forms.

pub mod cli;
pub mod config;
pub mod error;
pub mod net;
pub mod outbox;
pub mod output;
pub mod password;
pub mod store;
pub mod worker;

pub use error::{Error, Result};
