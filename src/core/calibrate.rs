//! Radiometric calibration of SEVIRI counts.
//!
//! `counts -> radiance` is the linear transform with header coefficients;
//! reflectance and brightness temperature are derived from radiance through a
//! [`RadiometricInversion`].

use crate::config::CalibrationMode;
use crate::io::header::FileHeader;
use crate::types::{
    CalibrationLevel, Channel, CountImage, NativeError, NativeResult, Platform, RealImage,
};

/// Planck radiation constant C1 (mW m-2 sr-1 (cm-1)-4)
pub const C1: f64 = 1.191_042_73e-5;
/// Planck radiation constant C2 (K cm)
pub const C2: f64 = 1.438_775_23;

/// Gain and offset turning counts into radiance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCoefficients {
    pub gain: f64,
    pub offset: f64,
}

impl CalibrationCoefficients {
    /// Pick the coefficients of `channel` from the header.
    ///
    /// The header carries coefficients for all twelve channels, so the table
    /// index is the channel's position in the full channel table, not its
    /// position among the channels present in the file. GSICS coefficients
    /// do not exist for the visible channels, which always use the nominal
    /// ones.
    pub fn select(header: &FileHeader, channel: Channel, mode: CalibrationMode) -> Self {
        let i = channel.index();
        match mode {
            CalibrationMode::Gsics if !channel.is_visible() => {
                let gain = header.gsics_cal_coeff[i];
                Self {
                    gain,
                    offset: header.gsics_offset_count[i] * gain,
                }
            }
            _ => Self {
                gain: header.cal_slope[i],
                offset: header.cal_offset[i],
            },
        }
    }
}

/// Widen counts to float, turning the fill value 0 into NaN
pub fn mask_fill(counts: &CountImage) -> RealImage {
    counts.mapv(|c| if c == 0 { f32::NAN } else { f32::from(c) })
}

/// `radiance = counts * gain + offset`, in place
pub fn convert_to_radiance(data: &mut RealImage, coefficients: CalibrationCoefficients) {
    let CalibrationCoefficients { gain, offset } = coefficients;
    map_inplace(data, move |v| (f64::from(v) * gain + offset) as f32);
}

#[cfg(feature = "parallel")]
fn map_inplace<F>(data: &mut RealImage, f: F)
where
    F: Fn(f32) -> f32 + Sync + Send,
{
    data.par_mapv_inplace(f);
}

#[cfg(not(feature = "parallel"))]
fn map_inplace<F>(data: &mut RealImage, f: F)
where
    F: Fn(f32) -> f32 + Sync + Send,
{
    data.mapv_inplace(f);
}

/// Converts radiance to reflectance or brightness temperature
pub trait RadiometricInversion: Send + Sync {
    /// Radiance to reflectance (%) for a visible channel
    fn vis_calibrate(&self, radiance: &mut RealImage, solar_irradiance: f64) -> NativeResult<()>;

    /// Radiance to brightness temperature (K) for an infrared channel
    fn ir_calibrate(
        &self,
        radiance: &mut RealImage,
        channel: Channel,
        processing_type: u8,
    ) -> NativeResult<()>;
}

/// Band constants of one infrared channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrConstants {
    /// Central wavenumber (cm-1)
    pub vc: f64,
    pub alpha: f64,
    pub beta: f64,
}

const fn ir(vc: f64, alpha: f64, beta: f64) -> IrConstants {
    IrConstants { vc, alpha, beta }
}

/// Solar irradiance of HRV, VIS006, VIS008, IR_016 per platform
const SOLAR_IRRADIANCE: [[f64; 4]; 4] = [
    [78.7599, 65.2296, 73.0127, 62.3715],
    [79.0113, 65.2065, 73.1869, 61.9923],
    [78.9416, 65.5148, 73.1807, 62.0208],
    [79.0035, 65.2656, 73.1692, 61.9416],
];

/// IR_039 ..= IR_134 per platform
const IR_CONSTANTS: [[IrConstants; 8]; 4] = [
    // Meteosat-8
    [
        ir(2567.330, 0.9956, 3.410),
        ir(1598.103, 0.9962, 2.218),
        ir(1362.081, 0.9991, 0.478),
        ir(1149.069, 0.9996, 0.179),
        ir(1034.343, 0.9999, 0.060),
        ir(930.647, 0.9983, 0.625),
        ir(839.660, 0.9988, 0.397),
        ir(752.387, 0.9981, 0.578),
    ],
    // Meteosat-9
    [
        ir(2568.832, 0.9954, 3.438),
        ir(1600.548, 0.9963, 2.185),
        ir(1360.330, 0.9991, 0.470),
        ir(1148.620, 0.9996, 0.179),
        ir(1035.289, 0.9999, 0.056),
        ir(931.700, 0.9983, 0.640),
        ir(836.445, 0.9988, 0.408),
        ir(751.792, 0.9981, 0.561),
    ],
    // Meteosat-10
    [
        ir(2547.771, 0.9915, 2.9002),
        ir(1595.621, 0.9960, 2.0337),
        ir(1360.337, 0.9991, 0.4340),
        ir(1148.130, 0.9996, 0.1714),
        ir(1034.715, 0.9999, 0.0527),
        ir(929.842, 0.9983, 0.6084),
        ir(838.659, 0.9988, 0.3882),
        ir(750.653, 0.9982, 0.5390),
    ],
    // Meteosat-11
    [
        ir(2555.280, 0.9916, 2.9438),
        ir(1596.080, 0.9959, 2.0780),
        ir(1361.748, 0.9990, 0.4929),
        ir(1147.433, 0.9996, 0.1731),
        ir(1034.851, 0.9998, 0.0597),
        ir(931.122, 0.9983, 0.6256),
        ir(839.113, 0.9988, 0.4002),
        ir(748.585, 0.9981, 0.5635),
    ],
];

/// Quadratic fit (a, b, c) from spectral-radiance temperature to
/// brightness temperature, IR_039 ..= IR_134
const BTFIT: [[f64; 3]; 8] = [
    [0.0, 1.011_751_900, -3.550_400],
    [0.000_018_057_00, 1.000_255_533, -1.790_930],
    [0.000_002_318_18, 1.000_668_281, -0.456_166],
    [-0.000_023_320_00, 1.011_803_400, -1.507_390],
    [-0.000_020_553_30, 1.009_370_670, -1.030_600],
    [-0.000_073_927_70, 1.032_889_800, -3.296_740],
    [-0.000_070_098_40, 1.031_314_600, -3.181_090],
    [-0.000_072_934_50, 1.030_424_800, -2.645_950],
];

fn visible_slot(channel: Channel) -> Option<usize> {
    match channel {
        Channel::Hrv => Some(0),
        Channel::Vis006 => Some(1),
        Channel::Vis008 => Some(2),
        Channel::Ir016 => Some(3),
        _ => None,
    }
}

fn infrared_slot(channel: Channel) -> Option<usize> {
    if channel.is_visible() {
        None
    } else {
        Some(channel.index() - Channel::Ir039.index())
    }
}

/// Solar irradiance of a visible channel
pub fn solar_irradiance(platform: Platform, channel: Channel) -> NativeResult<f64> {
    visible_slot(channel)
        .map(|slot| SOLAR_IRRADIANCE[platform.index()][slot])
        .ok_or_else(|| {
            NativeError::Configuration(format!("No solar irradiance for {}", channel))
        })
}

/// Band constants of an infrared channel
pub fn ir_constants(platform: Platform, channel: Channel) -> NativeResult<IrConstants> {
    infrared_slot(channel)
        .map(|slot| IR_CONSTANTS[platform.index()][slot])
        .ok_or_else(|| NativeError::Configuration(format!("No IR constants for {}", channel)))
}

/// Inverse Planck function at wavenumber `vc`
#[inline]
fn tl15(radiance: f64, vc: f64) -> f64 {
    (C2 * vc) / ((C1 * vc.powi(3) / radiance) + 1.0).ln()
}

/// Inversion with the published SEVIRI band constants of one platform
#[derive(Debug, Clone, Copy)]
pub struct SeviriInversion {
    platform: Platform,
}

impl SeviriInversion {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

impl RadiometricInversion for SeviriInversion {
    fn vis_calibrate(&self, radiance: &mut RealImage, solar_irradiance: f64) -> NativeResult<()> {
        map_inplace(radiance, move |v| (f64::from(v) * 100.0 / solar_irradiance) as f32);
        Ok(())
    }

    fn ir_calibrate(
        &self,
        radiance: &mut RealImage,
        channel: Channel,
        processing_type: u8,
    ) -> NativeResult<()> {
        let IrConstants { vc, alpha, beta } = ir_constants(self.platform, channel)?;
        match processing_type {
            // Effective radiance
            1 => map_inplace(radiance, move |v| {
                ((tl15(f64::from(v), vc) - beta) / alpha) as f32
            }),
            // Spectral radiance
            2 => {
                let slot = infrared_slot(channel).ok_or_else(|| {
                    NativeError::Configuration(format!("No BT fit for {}", channel))
                })?;
                let [a, b, c] = BTFIT[slot];
                map_inplace(radiance, move |v| {
                    let t = tl15(f64::from(v), vc);
                    (a * t * t + b * t + c) as f32
                });
            }
            other => {
                return Err(NativeError::NotImplemented(format!(
                    "Unknown calibration type {} for {}",
                    other, channel
                )))
            }
        }
        Ok(())
    }
}

/// Calibrates one channel of one file
pub struct CalibrationProcessor {
    channel: Channel,
    platform: Platform,
    coefficients: CalibrationCoefficients,
    processing_type: u8,
}

impl CalibrationProcessor {
    /// Create a processor for `channel` with coefficients chosen by `mode`
    pub fn new(header: &FileHeader, channel: Channel, mode: CalibrationMode) -> NativeResult<Self> {
        Ok(Self {
            channel,
            platform: Platform::from_satellite_id(header.satellite_id)?,
            coefficients: CalibrationCoefficients::select(header, channel, mode),
            processing_type: header.planned_chan_processing[channel.index()],
        })
    }

    pub fn coefficients(&self) -> CalibrationCoefficients {
        self.coefficients
    }

    /// Calibrate with the platform's SEVIRI band constants
    pub fn calibrate(&self, data: RealImage, level: CalibrationLevel) -> NativeResult<RealImage> {
        self.calibrate_with(data, level, &SeviriInversion::new(self.platform))
    }

    /// Calibrate `data` (counts as float, NaN for fill) to `level`
    pub fn calibrate_with(
        &self,
        mut data: RealImage,
        level: CalibrationLevel,
        inversion: &dyn RadiometricInversion,
    ) -> NativeResult<RealImage> {
        if !self.channel.calibrations().contains(&level) {
            return Err(NativeError::Configuration(format!(
                "Calibration {} not available for {}",
                level, self.channel
            )));
        }
        log::debug!(
            "Calibrating {} to {} (gain {}, offset {})",
            self.channel,
            level,
            self.coefficients.gain,
            self.coefficients.offset
        );

        if level == CalibrationLevel::Counts {
            return Ok(data);
        }

        convert_to_radiance(&mut data, self.coefficients);

        match level {
            CalibrationLevel::Reflectance => {
                let f = solar_irradiance(self.platform, self.channel)?;
                inversion.vis_calibrate(&mut data, f)?;
            }
            CalibrationLevel::BrightnessTemperature => {
                inversion.ir_calibrate(&mut data, self.channel, self.processing_type)?;
            }
            _ => {}
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::header::tests::sample_header;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_nominal_coefficients_use_full_table_index() {
        let header = sample_header();
        let c = CalibrationCoefficients::select(&header, Channel::Ir108, CalibrationMode::Nominal);
        assert_eq!(c.gain, header.cal_slope[8]);
        assert_eq!(c.offset, header.cal_offset[8]);
    }

    #[test]
    fn test_gsics_offset_scaled_by_gain() {
        let header = sample_header();
        let c = CalibrationCoefficients::select(&header, Channel::Ir108, CalibrationMode::Gsics);
        assert_eq!(c.gain, header.gsics_cal_coeff[8]);
        assert_relative_eq!(c.offset, header.gsics_offset_count[8] * header.gsics_cal_coeff[8]);
    }

    #[test]
    fn test_processor_keeps_selected_coefficients() {
        let header = sample_header();
        for mode in [CalibrationMode::Nominal, CalibrationMode::Gsics] {
            let processor = CalibrationProcessor::new(&header, Channel::Wv073, mode).unwrap();
            assert_eq!(
                processor.coefficients(),
                CalibrationCoefficients::select(&header, Channel::Wv073, mode)
            );
        }
    }

    #[test]
    fn test_gsics_visible_channels_stay_nominal() {
        let header = sample_header();
        for ch in [Channel::Vis006, Channel::Vis008, Channel::Ir016, Channel::Hrv] {
            assert_eq!(
                CalibrationCoefficients::select(&header, ch, CalibrationMode::Gsics),
                CalibrationCoefficients::select(&header, ch, CalibrationMode::Nominal)
            );
        }
    }

    #[test]
    fn test_mask_fill() {
        let counts: CountImage = array![[0u16, 1], [512, 1023]];
        let data = mask_fill(&counts);
        assert!(data[[0, 0]].is_nan());
        assert_eq!(data[[0, 1]], 1.0);
        assert_eq!(data[[1, 1]], 1023.0);
    }

    #[test]
    fn test_counts_is_identity() {
        let processor =
            CalibrationProcessor::new(&sample_header(), Channel::Vis006, CalibrationMode::Nominal)
                .unwrap();
        let data = array![[f32::NAN, 3.0], [100.0, 1023.0]];
        let out = processor.calibrate(data.clone(), CalibrationLevel::Counts).unwrap();
        assert!(out[[0, 0]].is_nan());
        assert_eq!(out.slice(ndarray::s![.., 1]), data.slice(ndarray::s![.., 1]));
    }

    #[test]
    fn test_radiance_strictly_increasing() {
        let processor =
            CalibrationProcessor::new(&sample_header(), Channel::Ir108, CalibrationMode::Nominal)
                .unwrap();
        let counts = Array2::from_shape_fn((1, 1023), |(_, j)| (j + 1) as f32);
        let radiance = processor.calibrate(counts, CalibrationLevel::Radiance).unwrap();
        assert!(radiance
            .row(0)
            .to_vec()
            .windows(2)
            .all(|w| w[1] > w[0]));
        assert_relative_eq!(
            radiance[[0, 0]],
            (0.2051 - 10.4601) as f32,
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_reflectance() {
        let processor =
            CalibrationProcessor::new(&sample_header(), Channel::Vis006, CalibrationMode::Nominal)
                .unwrap();
        let out = processor
            .calibrate(array![[100.0f32]], CalibrationLevel::Reflectance)
            .unwrap();
        let radiance = 100.0 * 0.0235 - 1.1985;
        assert_relative_eq!(
            out[[0, 0]],
            (radiance * 100.0 / 65.2656) as f32,
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_effective_radiance_brightness_temperature() {
        let inversion = SeviriInversion::new(Platform::Meteosat11);
        let IrConstants { vc, alpha, beta } =
            ir_constants(Platform::Meteosat11, Channel::Ir108).unwrap();
        let mut data = array![[100.0f32]];
        inversion.ir_calibrate(&mut data, Channel::Ir108, 1).unwrap();
        let expected = (tl15(100.0, vc) - beta) / alpha;
        assert_relative_eq!(data[[0, 0]], expected as f32, max_relative = 1e-6);
        assert!(data[[0, 0]] > 250.0 && data[[0, 0]] < 350.0);
    }

    #[test]
    fn test_spectral_radiance_brightness_temperature() {
        let inversion = SeviriInversion::new(Platform::Meteosat8);
        let mut data = array![[100.0f32]];
        inversion.ir_calibrate(&mut data, Channel::Ir108, 2).unwrap();
        let t = tl15(100.0, 930.647);
        let expected = -0.000_073_927_70 * t * t + 1.032_889_800 * t - 3.296_740;
        assert_relative_eq!(data[[0, 0]], expected as f32, max_relative = 1e-6);
    }

    #[test]
    fn test_unknown_processing_type() {
        let inversion = SeviriInversion::new(Platform::Meteosat10);
        let mut data = array![[100.0f32]];
        assert!(matches!(
            inversion.ir_calibrate(&mut data, Channel::Ir108, 3),
            Err(NativeError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_level_not_offered_by_channel() {
        let header = sample_header();
        let vis = CalibrationProcessor::new(&header, Channel::Vis008, CalibrationMode::Nominal)
            .unwrap();
        assert!(matches!(
            vis.calibrate(array![[1.0f32]], CalibrationLevel::BrightnessTemperature),
            Err(NativeError::Configuration(_))
        ));
        let ir = CalibrationProcessor::new(&header, Channel::Wv062, CalibrationMode::Nominal)
            .unwrap();
        assert!(ir
            .calibrate(array![[1.0f32]], CalibrationLevel::Reflectance)
            .is_err());
    }

    #[test]
    fn test_nan_propagates() {
        let processor =
            CalibrationProcessor::new(&sample_header(), Channel::Ir039, CalibrationMode::Gsics)
                .unwrap();
        let out = processor
            .calibrate(array![[f32::NAN, 500.0]], CalibrationLevel::BrightnessTemperature)
            .unwrap();
        assert!(out[[0, 0]].is_nan());
        assert!(out[[0, 1]].is_finite());
    }

    #[test]
    fn test_constant_tables() {
        assert_eq!(solar_irradiance(Platform::Meteosat9, Channel::Hrv).unwrap(), 79.0113);
        assert!(solar_irradiance(Platform::Meteosat9, Channel::Ir108).is_err());
        let c = ir_constants(Platform::Meteosat10, Channel::Ir134).unwrap();
        assert_eq!(c.vc, 750.653);
        assert!(ir_constants(Platform::Meteosat10, Channel::Hrv).is_err());
    }
}
