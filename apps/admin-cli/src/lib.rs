//! # tally-admin: Operator CLI Library
//!
//! Everything `tally-admin` does, minus argument parsing, so it can be
//! tested against an in-memory store.
//!
//! ## Module Organization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main.rs ──► config ──► AdminService::open ──► service ──► JSON stdout │
//! │                                                    │                    │
//! │                                   AdminError ──► ErrorReport ──► stderr │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::{AdminConfig, ConfigError};
pub use error::{AdminError, AdminResult, ErrorCode, ErrorReport};
pub use service::{AdminService, NextOpenReport, QuoteReport, StatusReport};
