pub mod app;
pub mod common;
pub mod config;
pub mod domain;
pub mod infra;
pub mod logging;
pub mod observability;
pub mod pipeline;
