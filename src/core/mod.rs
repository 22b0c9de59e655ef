//! Core processing: unpacking, calibration and geolocation

pub mod unpack;
pub mod calibrate;
pub mod geolocation;
pub mod area;

// Re-export main types
pub use unpack::{dec10216, dec10216_into, pack10216};
pub use calibrate::{
    CalibrationCoefficients, CalibrationProcessor, RadiometricInversion, SeviriInversion,
};
pub use geolocation::{AreaExtentKind, EarthModel, GeolocationResolver, WindowExtent};
pub use area::{Area, AreaDefinition};
