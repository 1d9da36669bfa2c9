//! Querygate - a read-only SQL gateway for LLM-generated queries.
//!
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod http;
pub mod logging;
pub mod query;
pub mod store;
