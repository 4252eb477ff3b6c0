//! HTTP transport and configuration for examlens.
//!
//! Implements the core `Transport` trait over `reqwest` and loads the
//! backend location, token and endpoint paths from `examlens.toml`.

pub mod config;
pub mod http;

pub use config::{create_transport, load_config, load_config_from, ClientConfig, EndpointPaths};
pub use http::HttpTransport;
