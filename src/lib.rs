//! chainprobe library interface
//!
//! Runs declarative HTTP test suites. Each step's templates are filled from a
//! variable store, the response is checked against an expected status and a
//! structural body pattern, and values extracted from it feed later steps.
//!
//! # Module Organization
//!
//! - [`pipeline`] - Substitution, path resolution, validation, the runner and reports
//! - [`client`] - HTTP transport
//! - [`errors`] - Error types (ChainprobeError, Result)
//! - [`status`] - Exit status codes (ExitStatus)
//! - [`core`] - Main execution logic

pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod status;
