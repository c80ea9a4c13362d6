//! sysweb - Local HTTP gateway for systemd
//!
//! Exposes unit state, recent journal entries and lifecycle actions
//! (start/stop/restart/status) to a browser or API client. Every request
//! runs one external tool (`systemctl` or `journalctl`) and translates its
//! text output into JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                HTTP gateway (axum)               │
//! ├─────────────────────────────────────────────────┤
//! │         ServiceControl (dispatch, queries)       │
//! ├────────────────────────┬────────────────────────┤
//! │  Parsers (units,       │  CommandRunner         │
//! │  status, journal)      │  (timeout, elevation)  │
//! └────────────────────────┴────────────────────────┘
//! ```

pub mod config;
pub mod control;
pub mod parse;
pub mod protocol;
pub mod runner;
pub mod server;

pub use config::{Config, ConfigError};
pub use control::{Action, ActionError, ActionOutcome, ActionRequest, ServiceControl};
pub use parse::{StatusRecord, UnitRecord};
pub use runner::{Capture, CommandResult, CommandRunner, Invocation, SystemRunner};
