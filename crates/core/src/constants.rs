//! Constants used throughout the core crate.
//!
//! Thresholds for the triage tree and bounds applied at the input-validation boundary live
//! here so the engines and the form shells agree on them.

/// Default port for the form shell when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 8501;

/// Embedded UKMEC summary table.
pub const UKMEC_TABLE_YAML: &str = include_str!("../data/ukmec.yaml");

/// FIT result (µg Hb/g faeces) at or above which the result is treated as positive.
pub const FIT_POSITIVE_THRESHOLD: f64 = 10.0;

/// FIT result at or above which the patient goes straight to the high-FIT pathway.
pub const FIT_HIGH_THRESHOLD: f64 = 100.0;

/// Inclusive bounds accepted for a FIT result.
pub const FIT_MIN: f64 = 0.0;
pub const FIT_MAX: f64 = 10_000.0;

/// Inclusive bounds accepted for age in the triage tree.
pub const TRIAGE_AGE_MIN: u32 = 16;
pub const TRIAGE_AGE_MAX: u32 = 120;

/// Weekly colon capsule endoscopy capacity quoted in recommendations.
pub const COLON_CAPSULE_WEEKLY_CAPACITY: u32 = 7;

/// Inclusive bounds for the contraceptive risk-profile form.
pub const PROFILE_AGE_MIN: u32 = 10;
pub const PROFILE_AGE_MAX: u32 = 60;
pub const PROFILE_BMI_MIN: f64 = 10.0;
pub const PROFILE_BMI_MAX: f64 = 70.0;
pub const PROFILE_CIGARETTES_MAX: u32 = 50;
pub const PROFILE_BREASTFEEDING_WEEKS_MAX: u32 = 26;
pub const PROFILE_POSTPARTUM_WEEKS_MAX: u32 = 52;
