//! MCP server module
//!
//! Exposes the dilution calculator as MCP tools over stdio.

pub mod server;

pub use server::DilutionService;
