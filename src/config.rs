//! Reader configuration

use crate::types::{NativeError, NativeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source of the counts-to-radiance coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CalibrationMode {
    /// Level 1.5 image calibration coefficients from the header
    #[default]
    Nominal,
    /// GSICS inter-calibration feedback coefficients (IR channels only)
    Gsics,
}

impl FromStr for CalibrationMode {
    type Err = NativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOMINAL" => Ok(CalibrationMode::Nominal),
            "GSICS" => Ok(CalibrationMode::Gsics),
            _ => Err(NativeError::Configuration(format!(
                "Unknown calibration mode: {}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for CalibrationMode {
    type Error = NativeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalibrationMode> for String {
    fn from(mode: CalibrationMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationMode::Nominal => write!(f, "nominal"),
            CalibrationMode::Gsics => write!(f, "gsics"),
        }
    }
}

/// Options for opening a native file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub calib_mode: CalibrationMode,
    /// Scan lines unpacked per work unit
    pub chunk_lines: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            calib_mode: CalibrationMode::Nominal,
            chunk_lines: 512,
        }
    }
}

impl ReaderConfig {
    pub fn with_calib_mode(mut self, mode: CalibrationMode) -> Self {
        self.calib_mode = mode;
        self
    }

    pub fn validate(&self) -> NativeResult<()> {
        if self.chunk_lines == 0 {
            return Err(NativeError::Configuration(
                "chunk_lines must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_mode_case_insensitive() {
        assert_eq!("gsics".parse::<CalibrationMode>().unwrap(), CalibrationMode::Gsics);
        assert_eq!("GSICS".parse::<CalibrationMode>().unwrap(), CalibrationMode::Gsics);
        assert_eq!("Nominal".parse::<CalibrationMode>().unwrap(), CalibrationMode::Nominal);
    }

    #[test]
    fn test_unknown_calibration_mode_rejected() {
        let err = "mpef".parse::<CalibrationMode>().unwrap_err();
        assert!(matches!(err, NativeError::Configuration(_)));
    }

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.calib_mode, CalibrationMode::Nominal);
        assert!(config.validate().is_ok());

        let bad = ReaderConfig {
            chunk_lines: 0,
            ..ReaderConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
