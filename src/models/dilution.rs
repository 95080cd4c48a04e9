//! Dilution model
//!
//! Represents a dilution request and the resulting plan of one or two mixing
//! steps. All concentrations inside a plan are in ng/µL; volumes carry the
//! caller's volume unit (µL in every user-facing message).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::concentration::{convert_to_ng_per_ul, parse_form_integer, parse_form_number};

/// Tolerance used when checking that stock + diluent adds up to the final volume
pub const VOLUME_TOLERANCE: f64 = 1e-9;

/// User-facing dilution errors
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DilutionError {
    #[error("Please enter valid numbers.")]
    InvalidInput,

    #[error("Target concentration must be lower than current concentration.")]
    InvalidTarget,

    #[error("Dilution steps must be 1 or 2.")]
    UnsupportedSteps(i64),

    #[error("Concentrations cannot be negative.")]
    NegativeConcentration,

    #[error("Final volume must be greater than zero.")]
    InvalidVolume,
}

impl DilutionError {
    /// Stable snake_case identifier for API responses
    pub fn kind(&self) -> &'static str {
        match self {
            DilutionError::InvalidInput => "invalid_input",
            DilutionError::InvalidTarget => "invalid_target",
            DilutionError::UnsupportedSteps(_) => "unsupported_steps",
            DilutionError::NegativeConcentration => "negative_concentration",
            DilutionError::InvalidVolume => "invalid_volume",
        }
    }
}

pub type DilutionResult<T> = Result<T, DilutionError>;

/// Dilution method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DilutionMethod {
    OneStep,
    TwoStep,
}

impl DilutionMethod {
    pub fn from_steps(steps: i64) -> DilutionResult<Self> {
        match steps {
            1 => Ok(DilutionMethod::OneStep),
            2 => Ok(DilutionMethod::TwoStep),
            other => Err(DilutionError::UnsupportedSteps(other)),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DilutionMethod::OneStep => "One-Step Dilution",
            DilutionMethod::TwoStep => "Two-Step Dilution",
        }
    }
}

/// Raw form fields, as typed by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DilutionForm {
    pub initial_concentration: String,
    pub initial_unit: String,
    pub target_concentration: String,
    pub target_unit: String,
    pub final_volume: String,
    /// Missing or unparseable step counts fall back to one step
    pub steps: Option<String>,
}

/// A validated-for-parsing dilution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilutionRequest {
    pub initial_concentration: f64,
    pub initial_unit: String,
    pub target_concentration: f64,
    pub target_unit: String,
    pub final_volume: f64,
    pub steps: i64,
}

impl DilutionRequest {
    /// Build a request from raw form fields
    ///
    /// Fails with `InvalidInput` when any of the three numeric fields does not
    /// parse. Unit tags are carried through untouched.
    pub fn from_form(form: &DilutionForm) -> DilutionResult<Self> {
        let initial = parse_form_number(&form.initial_concentration);
        let target = parse_form_number(&form.target_concentration);
        let volume = parse_form_number(&form.final_volume);

        let (Some(initial_concentration), Some(target_concentration), Some(final_volume)) =
            (initial, target, volume)
        else {
            return Err(DilutionError::InvalidInput);
        };

        let steps = form
            .steps
            .as_deref()
            .and_then(parse_form_integer)
            .unwrap_or(1);

        Ok(Self {
            initial_concentration,
            initial_unit: form.initial_unit.clone(),
            target_concentration,
            target_unit: form.target_unit.clone(),
            final_volume,
            steps,
        })
    }

    /// Initial concentration in ng/µL
    pub fn initial_ng_per_ul(&self) -> f64 {
        convert_to_ng_per_ul(self.initial_concentration, &self.initial_unit)
    }

    /// Target concentration in ng/µL
    pub fn target_ng_per_ul(&self) -> f64 {
        convert_to_ng_per_ul(self.target_concentration, &self.target_unit)
    }
}

/// One mixing operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DilutionStep {
    /// 1-based position within the plan
    pub step_index: u8,
    pub stock_volume: f64,
    pub diluent_volume: f64,
}

impl DilutionStep {
    /// Stock needed to take `from` down to `to` in `final_volume`
    fn between(step_index: u8, from: f64, to: f64, final_volume: f64) -> Self {
        let stock_volume = to * final_volume / from;
        Self {
            step_index,
            stock_volume,
            diluent_volume: final_volume - stock_volume,
        }
    }

    pub fn total_volume(&self) -> f64 {
        self.stock_volume + self.diluent_volume
    }
}

/// The computed result of a dilution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilutionPlan {
    pub method: DilutionMethod,
    pub initial_ng_per_ul: f64,
    pub target_ng_per_ul: f64,
    /// Midpoint concentration between the two steps (two-step plans only)
    pub intermediate_ng_per_ul: Option<f64>,
    pub final_volume: f64,
    pub steps: Vec<DilutionStep>,
}

impl DilutionPlan {
    /// Compute the plan for a request
    ///
    /// Validation order: non-finite numbers, target below initial (after
    /// normalization), negative target, step count, final volume.
    pub fn compute(request: &DilutionRequest) -> DilutionResult<Self> {
        if !request.initial_concentration.is_finite()
            || !request.target_concentration.is_finite()
            || !request.final_volume.is_finite()
        {
            return Err(DilutionError::InvalidInput);
        }

        let initial = request.initial_ng_per_ul();
        let target = request.target_ng_per_ul();

        if target >= initial {
            return Err(DilutionError::InvalidTarget);
        }

        // target < initial already holds, so this also covers a negative initial
        if target < 0.0 {
            return Err(DilutionError::NegativeConcentration);
        }

        let method = DilutionMethod::from_steps(request.steps)?;

        if request.final_volume <= 0.0 {
            return Err(DilutionError::InvalidVolume);
        }

        let final_volume = request.final_volume;

        let plan = match method {
            DilutionMethod::OneStep => Self {
                method,
                initial_ng_per_ul: initial,
                target_ng_per_ul: target,
                intermediate_ng_per_ul: None,
                final_volume,
                steps: vec![DilutionStep::between(1, initial, target, final_volume)],
            },
            DilutionMethod::TwoStep => {
                let intermediate = (initial + target) / 2.0;
                Self {
                    method,
                    initial_ng_per_ul: initial,
                    target_ng_per_ul: target,
                    intermediate_ng_per_ul: Some(intermediate),
                    final_volume,
                    steps: vec![
                        DilutionStep::between(1, initial, intermediate, final_volume),
                        DilutionStep::between(2, intermediate, target, final_volume),
                    ],
                }
            }
        };

        tracing::debug!(
            "Computed {} plan: {} -> {} ng/µL in {}",
            plan.method.display_name(),
            initial,
            target,
            final_volume
        );

        Ok(plan)
    }
}
