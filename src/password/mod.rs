//! Password validation engine
//!
//! A pure, deterministic scorer: no network, no storage, nothing carried
//! between calls.

pub mod checks;
pub mod config;
pub mod validator;
pub mod wordlist;

pub use config::{PartialPasswordConfig, PasswordConfig, PasswordContext, Preset, Strength};
pub use validator::{
    CheckKind, PasswordValidator, ValidationCheck, ValidationResult, validate_password,
};
pub use wordlist::WordList;
