//! Data models
//!
//! Rust structs for dilution requests and plans.

mod dilution;

pub use dilution::{
    DilutionError, DilutionForm, DilutionMethod, DilutionPlan, DilutionRequest, DilutionResult,
    DilutionStep, VOLUME_TOLERANCE,
};
