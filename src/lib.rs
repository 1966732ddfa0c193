// embedcache - prediction service with a risk-driven adaptive embedding cache

pub mod agent;
pub mod cache;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod models;
pub mod server;
pub mod service;
pub mod utils;
