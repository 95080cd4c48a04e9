//! DNA Dilution Calculator Library
//!
//! Core functionality for one- and two-step DNA dilution planning.

pub mod concentration;
pub mod config;
pub mod mcp;
pub mod models;
pub mod tools;
