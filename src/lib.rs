pub mod ai_provider;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod http;
pub mod identity;
pub mod logging;
pub mod service;
pub mod store;
pub mod types;
