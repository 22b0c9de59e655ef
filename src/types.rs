use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw 10-bit instrument counts widened to 16 bits (lines x columns)
pub type CountImage = Array2<u16>;

/// Calibrated floating point image (lines x columns)
pub type RealImage = Array2<f32>;

/// Number of lines of a full disk VIS/IR image
pub const VISIR_NUM_LINES: usize = 3712;
/// Number of columns of a full disk VIS/IR image
pub const VISIR_NUM_COLUMNS: usize = 3712;
/// Number of lines of the full HRV reference grid
pub const HRV_NUM_LINES: usize = 11136;
/// Number of columns of the full HRV reference grid
pub const HRV_NUM_COLUMNS: usize = 11136;

/// Nominal satellite altitude above the Earth surface (meters)
pub const SATELLITE_ALTITUDE: f64 = 35_785_831.0;

/// The twelve SEVIRI channels, in header band-selection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Vis006,
    Vis008,
    Ir016,
    Ir039,
    Wv062,
    Wv073,
    Ir087,
    Ir097,
    Ir108,
    Ir120,
    Ir134,
    Hrv,
}

impl Channel {
    /// All channels in the order of the header band-selection bitstring
    pub const ALL: [Channel; 12] = [
        Channel::Vis006,
        Channel::Vis008,
        Channel::Ir016,
        Channel::Ir039,
        Channel::Wv062,
        Channel::Wv073,
        Channel::Ir087,
        Channel::Ir097,
        Channel::Ir108,
        Channel::Ir120,
        Channel::Ir134,
        Channel::Hrv,
    ];

    /// Position in the full 12-channel table (0-based).
    ///
    /// Header coefficient arrays always cover all twelve channels, so this
    /// index is valid for them whatever subset the file actually carries.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Channel for a 1-based band number as used by the format documentation
    pub fn from_band_number(band: usize) -> Option<Channel> {
        band.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Vis006 => "VIS006",
            Channel::Vis008 => "VIS008",
            Channel::Ir016 => "IR_016",
            Channel::Ir039 => "IR_039",
            Channel::Wv062 => "WV_062",
            Channel::Wv073 => "WV_073",
            Channel::Ir087 => "IR_087",
            Channel::Ir097 => "IR_097",
            Channel::Ir108 => "IR_108",
            Channel::Ir120 => "IR_120",
            Channel::Ir134 => "IR_134",
            Channel::Hrv => "HRV",
        }
    }

    pub fn is_hrv(self) -> bool {
        self == Channel::Hrv
    }

    /// Solar channels, calibrated to reflectance
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            Channel::Hrv | Channel::Vis006 | Channel::Vis008 | Channel::Ir016
        )
    }

    /// Spectral response (min, central, max) in micrometers
    pub fn wavelength(self) -> [f64; 3] {
        match self {
            Channel::Vis006 => [0.56, 0.635, 0.71],
            Channel::Vis008 => [0.74, 0.81, 0.88],
            Channel::Ir016 => [1.5, 1.64, 1.78],
            Channel::Ir039 => [3.48, 3.92, 4.36],
            Channel::Wv062 => [5.35, 6.25, 7.15],
            Channel::Wv073 => [6.85, 7.35, 7.85],
            Channel::Ir087 => [8.3, 8.7, 9.1],
            Channel::Ir097 => [9.38, 9.66, 9.94],
            Channel::Ir108 => [9.8, 10.8, 11.8],
            Channel::Ir120 => [11.0, 12.0, 13.0],
            Channel::Ir134 => [12.4, 13.4, 14.4],
            Channel::Hrv => [0.5, 0.7, 0.9],
        }
    }

    /// Calibration levels this channel can be delivered at
    pub fn calibrations(self) -> [CalibrationLevel; 3] {
        let derived = if self.is_visible() {
            CalibrationLevel::Reflectance
        } else {
            CalibrationLevel::BrightnessTemperature
        };
        [CalibrationLevel::Counts, CalibrationLevel::Radiance, derived]
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Channel {
    type Err = NativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NativeError::Configuration(format!("Unknown channel: {}", s)))
    }
}

/// Meteosat Second Generation platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Meteosat8,
    Meteosat9,
    Meteosat10,
    Meteosat11,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Meteosat8,
        Platform::Meteosat9,
        Platform::Meteosat10,
        Platform::Meteosat11,
    ];

    /// Look up the platform from the header satellite id (321..=324)
    pub fn from_satellite_id(id: u16) -> NativeResult<Self> {
        match id {
            321 => Ok(Platform::Meteosat8),
            322 => Ok(Platform::Meteosat9),
            323 => Ok(Platform::Meteosat10),
            324 => Ok(Platform::Meteosat11),
            other => Err(NativeError::InvalidFormat(format!(
                "Unknown satellite id: {}",
                other
            ))),
        }
    }

    pub fn satellite_id(self) -> u16 {
        321 + self as u16
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn number(self) -> u8 {
        8 + self as u8
    }

    pub fn name(self) -> String {
        format!("Meteosat-{}", self.number())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Meteosat-{}", self.number())
    }
}

/// Level a dataset is calibrated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationLevel {
    Counts,
    Radiance,
    Reflectance,
    BrightnessTemperature,
}

impl CalibrationLevel {
    pub fn name(self) -> &'static str {
        match self {
            CalibrationLevel::Counts => "counts",
            CalibrationLevel::Radiance => "radiance",
            CalibrationLevel::Reflectance => "reflectance",
            CalibrationLevel::BrightnessTemperature => "brightness_temperature",
        }
    }

    pub fn units(self) -> &'static str {
        match self {
            CalibrationLevel::Counts => "1",
            CalibrationLevel::Radiance => "mW m-2 sr-1 (cm-1)-1",
            CalibrationLevel::Reflectance => "%",
            CalibrationLevel::BrightnessTemperature => "K",
        }
    }

    pub fn standard_name(self) -> &'static str {
        match self {
            CalibrationLevel::Counts => "counts",
            CalibrationLevel::Radiance => "toa_outgoing_radiance_per_unit_wavenumber",
            CalibrationLevel::Reflectance => "toa_bidirectional_reflectance",
            CalibrationLevel::BrightnessTemperature => "toa_brightness_temperature",
        }
    }
}

impl fmt::Display for CalibrationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CalibrationLevel {
    type Err = NativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "counts" => Ok(CalibrationLevel::Counts),
            "radiance" => Ok(CalibrationLevel::Radiance),
            "reflectance" => Ok(CalibrationLevel::Reflectance),
            "brightness_temperature" => Ok(CalibrationLevel::BrightnessTemperature),
            _ => Err(NativeError::Configuration(format!(
                "Unknown calibration: {}",
                s
            ))),
        }
    }
}

/// Bounding box in projection-plane meters
/// (lower-left x, lower-left y, upper-right x, upper-right y)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaExtent {
    pub ll_x: f64,
    pub ll_y: f64,
    pub ur_x: f64,
    pub ur_y: f64,
}

impl AreaExtent {
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.ll_x, self.ll_y, self.ur_x, self.ur_y)
    }

    pub fn width(&self) -> f64 {
        self.ur_x - self.ll_x
    }

    pub fn height(&self) -> f64 {
        self.ur_y - self.ll_y
    }
}

/// Geostationary projection parameters of the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParameters {
    /// Equatorial radius (meters)
    pub a: f64,
    /// Polar radius (meters)
    pub b: f64,
    /// Satellite altitude above the surface (meters)
    pub h: f64,
    /// Sub-satellite point longitude (degrees east)
    pub ssp_longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalParameters {
    pub projection_longitude: f64,
    pub projection_latitude: f64,
    pub projection_altitude: f64,
}

/// Metadata attached to every decoded dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAttributes {
    pub units: String,
    pub wavelength: [f64; 3],
    pub standard_name: String,
    pub platform_name: String,
    pub sensor: String,
    pub orbital_parameters: OrbitalParameters,
}

/// One channel decoded and calibrated to the requested level
#[derive(Debug, Clone)]
pub struct CalibratedDataset {
    pub channel: Channel,
    pub calibration: CalibrationLevel,
    pub data: RealImage,
    pub attrs: DatasetAttributes,
}

/// Error types for native file decoding
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Channel {0} not available in the file")]
    ChannelNotAvailable(Channel),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for native file operations
pub type NativeResult<T> = Result<T, NativeError>;
