//! TeamCity queue exporter service
//!
//! Configuration loading and the HTTP surface serving scrapes, the landing
//! page and health endpoints.

pub mod api;
pub mod config;
