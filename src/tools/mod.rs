//! MCP tool implementations

pub mod chart;
pub mod dilution;
pub mod status;
