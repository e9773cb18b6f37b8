// src/lib.rs
pub mod client;
pub mod commands;
pub mod config;
pub mod errors;
pub mod github;
pub mod payload;
pub mod reporter;
pub mod session;

pub use client::{Method, RequestClient, RetryPolicy};
pub use config::Context;
pub use errors::{Result, RunnerError};
pub use payload::{Data, Payload};
