//! Concentration module
//!
//! Handles concentration units, normalization to ng/µL and form-value parsing.

pub mod converter;
pub mod units;

pub use converter::{
    convert_concentration, convert_from_ng_per_ul, convert_to_ng_per_ul, parse_form_integer,
    parse_form_number,
};
pub use units::{ng_per_ul_factor, ConcentrationUnit, BASE_UNIT};
