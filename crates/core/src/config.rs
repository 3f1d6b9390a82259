//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then shared read-only with every
//! request. Environment variables are read by the binaries and passed in here as values, so
//! request handling never touches process-wide state.

use crate::constants::DEFAULT_PORT;
use crate::eligibility::EligibilityTable;
use crate::{CdsError, CdsResult};
use std::sync::Arc;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    eligibility_table: Arc<EligibilityTable>,
}

impl CoreConfig {
    /// Load the embedded eligibility table.
    ///
    /// # Errors
    ///
    /// Returns [`CdsError::TableSchema`] if the embedded table fails validation.
    pub fn new() -> CdsResult<Self> {
        Ok(Self::with_table(EligibilityTable::ukmec()?))
    }

    /// Use an already parsed table.
    pub fn with_table(table: EligibilityTable) -> Self {
        Self {
            eligibility_table: Arc::new(table),
        }
    }

    pub fn eligibility_table(&self) -> &EligibilityTable {
        &self.eligibility_table
    }
}

/// Parse the listening port from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PORT`].
///
/// # Errors
///
/// Returns [`CdsError::InvalidInput`] if the value is not a number in 1..=65535.
pub fn port_from_env_value(value: Option<String>) -> CdsResult<u16> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let Some(raw) = value else {
        return Ok(DEFAULT_PORT);
    };

    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(CdsError::InvalidInput(format!(
            "PORT must be a number between 1 and 65535, got {raw:?}"
        ))),
        Ok(port) => Ok(port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset_or_blank() {
        assert_eq!(port_from_env_value(None).unwrap(), 8501);
        assert_eq!(port_from_env_value(Some("  ".into())).unwrap(), 8501);
    }

    #[test]
    fn port_parses_trimmed_value() {
        assert_eq!(port_from_env_value(Some(" 9000 ".into())).unwrap(), 9000);
    }

    #[test]
    fn port_rejects_garbage_and_zero() {
        assert!(port_from_env_value(Some("http".into())).is_err());
        assert!(port_from_env_value(Some("0".into())).is_err());
        assert!(port_from_env_value(Some("70000".into())).is_err());
    }

    #[test]
    fn config_loads_embedded_table() {
        let cfg = CoreConfig::new().expect("embedded table");
        assert!(cfg.eligibility_table().contains("BMI_GE_35"));
    }
}
