//! Runtime adapters for the debate engine: TOML configuration, the
//! chat-completions gateway responder, logging, and the CLI definition.

pub mod cli;
pub mod config;
pub mod gateway;
pub mod telemetry;
