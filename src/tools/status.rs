//! Dilution Status Tool
//!
//! Provides build metadata, runtime status information and the usage guide
//! for the service.

use serde::Serialize;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::config::ServiceConfig;

/// Build number embedded by `build.rs`, incremented on each recompilation
pub const BUILD_NUMBER: u64 = match option_env!("DNADIL_BUILD_NUMBER") {
    Some(s) => match parse_u64(s) {
        Some(n) => n,
        None => 0,
    },
    None => 0,
};

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("DNADIL_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const fn parse_u64(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < b'0' || b > b'9' {
            return None;
        }
        result = result * 10 + (b - b'0') as u64;
        i += 1;
    }
    Some(result)
}

/// Print the startup banner to stderr
pub fn print_startup_banner() {
    eprintln!("===============================================");
    eprintln!("  DNA Dilution Calculator");
    eprintln!("  Version: {} | Build: {}", VERSION, BUILD_NUMBER);
    eprintln!("  Compiled: {}", BUILD_TIMESTAMP);
    eprintln!("===============================================");
}

/// Dilution planning instructions for AI assistants
pub const DILUTION_INSTRUCTIONS: &str = r#"
# DNA Dilution Instructions

This guide explains how to plan a DNA dilution with the calculator tools.

## Inputs

| Field | Example | Notes |
|-------|---------|-------|
| initial_concentration | 100 | Concentration of the stock DNA |
| initial_unit | ng/µL | One of ng/µL, µg/mL, mg/mL |
| target_concentration | 10 | Must be LOWER than the stock after unit conversion |
| target_unit | ng/µL | One of ng/µL, µg/mL, mg/mL |
| final_volume | 50 | Volume of each mixture, in µL |
| steps | 1 | 1 = one-step, 2 = two-step via an intermediate |

Numbers may be sent as JSON numbers or as text typed into a form ("12.5").
Unrecognized unit tags are treated as ng/µL, so double-check the spelling
(`ug/ml` and `µg/mL` both work).

## Unit Conversion

All calculations run in ng/µL:
- ng/µL × 1
- µg/mL × 1,000
- mg/mL × 1,000,000

Use `convert_concentration` to check a conversion before calculating.

## One-Step Dilution

stock = target × final_volume / initial
diluent = final_volume − stock

**Example:** 100 ng/µL → 10 ng/µL in 50 µL
→ 5.00 µL stock DNA + 45.00 µL diluent

## Two-Step Dilution

The intermediate concentration is the midpoint of initial and target.
Step 1 dilutes the stock to the intermediate, step 2 dilutes the intermediate
to the target, each in final_volume.

**Example:** 100 ng/µL → 10 ng/µL in 50 µL
→ intermediate 55.00 ng/µL
→ step 1: 27.50 µL stock + 22.50 µL diluent
→ step 2: 9.09 µL intermediate + 40.91 µL diluent

## Errors

| error_kind | Message |
|------------|---------|
| invalid_input | Please enter valid numbers. |
| invalid_target | Target concentration must be lower than current concentration. |
| negative_concentration | Concentrations cannot be negative. |
| unsupported_steps | Dilution steps must be 1 or 2. |
| invalid_volume | Final volume must be greater than zero. |

Relay the message to the user as-is and ask for corrected values.

## Charts

`calculate_dilution` returns one PNG bar chart per step: green is stock DNA,
blue is diluent. Use `render_dilution_chart` to draw a single bar from
volumes you already have.
"#;

/// Status information for the dilution service
#[derive(Debug, Serialize)]
pub struct DilutionStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub config: ServiceConfig,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Tracks service runtime state
pub struct StatusTracker {
    start_time: Instant,
    config: ServiceConfig,
}

impl StatusTracker {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            start_time: Instant::now(),
            config,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> DilutionStatus {
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        DilutionStatus {
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
            version: VERSION,
            config: self.config.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_process() {
        let tracker = StatusTracker::new(ServiceConfig::default());
        let status = tracker.get_status();
        assert_eq!(status.process_id, std::process::id());
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(status.build_number, BUILD_NUMBER);
        assert_eq!(status.build_timestamp, BUILD_TIMESTAMP);
        assert_eq!(status.config.chart_width, 400);
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("42"), Some(42));
        assert_eq!(parse_u64("0"), Some(0));
        assert_eq!(parse_u64(""), None);
        assert_eq!(parse_u64("4x"), None);
    }

    #[test]
    fn test_instructions_match_worked_examples() {
        assert!(DILUTION_INSTRUCTIONS.contains("5.00 µL stock DNA + 45.00 µL diluent"));
        assert!(DILUTION_INSTRUCTIONS.contains("Target concentration must be lower than current concentration."));
        assert!(DILUTION_INSTRUCTIONS.contains("Concentrations cannot be negative."));
    }
}
