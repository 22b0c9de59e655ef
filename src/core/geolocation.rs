//! Projection-plane extent of a channel.
//!
//! Files produced with earth model 1 (before December 2017) are shifted by
//! 1.5 km towards North-West against the nominal geostationary projection;
//! the extent is corrected by half a VIS/IR pixel or one and a half HRV
//! pixels. Line and column numbers count from the south-east corner.

use crate::io::header::{FileHeader, ReferenceGrid};
use crate::io::trailer::{Coverage, Trailer};
use crate::types::{AreaExtent, Channel, NativeError, NativeResult, HRV_NUM_COLUMNS, VISIR_NUM_COLUMNS};

/// Reference ellipsoid convention of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarthModel {
    /// Uncorrected geolocation (1.5 km offset)
    Offset,
    /// Corrected geolocation
    Corrected,
}

impl TryFrom<u8> for EarthModel {
    type Error = NativeError;

    fn try_from(value: u8) -> NativeResult<Self> {
        match value {
            1 => Ok(EarthModel::Offset),
            2 => Ok(EarthModel::Corrected),
            other => Err(NativeError::NotImplemented(format!(
                "Unrecognised Earth model: {}",
                other
            ))),
        }
    }
}

impl EarthModel {
    /// (north-south, west-east) offsets in grid cells
    pub fn offsets(self, channel: Channel) -> (f64, f64) {
        match (self, channel.is_hrv()) {
            (EarthModel::Corrected, _) => (0.0, 0.0),
            (EarthModel::Offset, false) => (-0.5, 0.5),
            (EarthModel::Offset, true) => (-1.5, 1.5),
        }
    }
}

/// Grid origin code of the south-east corner, the only supported origin
pub const GRID_ORIGIN_SOUTH_EAST: u8 = 2;

fn grid_origin_name(origin: u8) -> &'static str {
    match origin {
        0 => "NW",
        1 => "SW",
        2 => "SE",
        3 => "NE",
        _ => "unknown",
    }
}

/// Line/column bounds of a window, in grid numbering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub north: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
}

impl From<&Coverage> for Bounds {
    fn from(c: &Coverage) -> Self {
        Self {
            north: f64::from(c.north_line),
            east: f64::from(c.east_column),
            south: f64::from(c.south_line),
            west: f64::from(c.west_column),
        }
    }
}

/// Extent of a window for a grid centred on `center_point`
pub fn calculate_area_extent(
    center_point: f64,
    bounds: Bounds,
    we_offset: f64,
    ns_offset: f64,
    column_step: f64,
    line_step: f64,
) -> AreaExtent {
    AreaExtent {
        ll_x: (center_point - bounds.east + 0.5 + we_offset) * column_step,
        ll_y: (bounds.north - center_point + 0.5 + ns_offset) * line_step,
        ur_x: (center_point - bounds.west - 0.5 + we_offset) * column_step,
        ur_y: (bounds.south - center_point - 0.5 + ns_offset) * line_step,
    }
}

/// One HRV scan window and its size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowExtent {
    pub extent: AreaExtent,
    pub lines: i64,
    pub columns: i64,
}

/// Result of an extent request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaExtentKind {
    Single(AreaExtent),
    /// Full disk HRV, acquired as two independent windows
    Split {
        upper: WindowExtent,
        lower: WindowExtent,
    },
}

impl AreaExtentKind {
    pub fn single(&self) -> Option<AreaExtent> {
        match self {
            AreaExtentKind::Single(extent) => Some(*extent),
            AreaExtentKind::Split { .. } => None,
        }
    }
}

/// Computes channel extents from a header and trailer
pub struct GeolocationResolver<'a> {
    header: &'a FileHeader,
    trailer: &'a Trailer,
    is_full_disk: bool,
}

impl<'a> GeolocationResolver<'a> {
    pub fn new(header: &'a FileHeader, trailer: &'a Trailer, is_full_disk: bool) -> Self {
        Self {
            header,
            trailer,
            is_full_disk,
        }
    }

    pub fn is_rapid_scan(&self) -> bool {
        self.trailer.reduced_scan
    }

    pub fn area_extent(&self, channel: Channel) -> NativeResult<AreaExtentKind> {
        let earth_model = EarthModel::try_from(self.header.type_of_earth_model)?;
        let (ns_offset, we_offset) = earth_model.offsets(channel);

        let (grid, center_point, coeff): (&ReferenceGrid, f64, i32) = if channel.is_hrv() {
            (
                &self.header.reference_grid_hrv,
                (HRV_NUM_COLUMNS / 2 - 2) as f64,
                3,
            )
        } else {
            (
                &self.header.reference_grid_visir,
                (VISIR_NUM_COLUMNS / 2) as f64,
                1,
            )
        };

        if grid.grid_origin != GRID_ORIGIN_SOUTH_EAST {
            return Err(NativeError::NotImplemented(format!(
                "Grid origin not supported number: {}, {} corner",
                grid.grid_origin,
                grid_origin_name(grid.grid_origin)
            )));
        }

        let column_step = f64::from(grid.column_dir_grid_step) * 1000.0;
        let line_step = f64::from(grid.line_dir_grid_step) * 1000.0;
        let extent = |bounds: Bounds| {
            calculate_area_extent(center_point, bounds, we_offset, ns_offset, column_step, line_step)
        };

        if channel.is_hrv() && (self.is_full_disk || self.is_rapid_scan()) {
            // Actual scanned windows from the trailer
            let lower_coverage = &self.trailer.coverage_hrv_lower;
            let lower_extent = extent(Bounds::from(lower_coverage));
            if self.is_rapid_scan() {
                log::debug!("Rapid scan HRV, lower window only");
                return Ok(AreaExtentKind::Single(lower_extent));
            }

            let upper_coverage = &self.trailer.coverage_hrv_upper;
            return Ok(AreaExtentKind::Split {
                upper: WindowExtent {
                    extent: extent(Bounds::from(upper_coverage)),
                    lines: upper_coverage.number_of_lines(),
                    columns: upper_coverage.number_of_columns(),
                },
                lower: WindowExtent {
                    extent: lower_extent,
                    lines: lower_coverage.number_of_lines(),
                    columns: lower_coverage.number_of_columns(),
                },
            });
        }

        // Selected rectangle, scaled to the HRV grid when needed
        let scaled = |v: i32| f64::from(coeff) * f64::from(v);
        Ok(AreaExtentKind::Single(extent(Bounds {
            north: scaled(self.header.north_line_selected),
            east: scaled(self.header.east_column_selected),
            south: scaled(self.header.south_line_selected),
            west: scaled(self.header.west_column_selected),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::header::tests::sample_header;
    use crate::io::trailer::tests::sample_trailer;
    use approx::assert_relative_eq;

    #[test]
    fn test_offsets() {
        assert_eq!(EarthModel::Offset.offsets(Channel::Ir108), (-0.5, 0.5));
        assert_eq!(EarthModel::Offset.offsets(Channel::Hrv), (-1.5, 1.5));
        for ch in Channel::ALL {
            assert_eq!(EarthModel::Corrected.offsets(ch), (0.0, 0.0));
        }
    }

    #[test]
    fn test_unknown_earth_model() {
        assert!(matches!(
            EarthModel::try_from(0),
            Err(NativeError::NotImplemented(_))
        ));
        let mut header = sample_header();
        header.type_of_earth_model = 3;
        let trailer = sample_trailer();
        let resolver = GeolocationResolver::new(&header, &trailer, true);
        assert!(matches!(
            resolver.area_extent(Channel::Vis006),
            Err(NativeError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_full_disk_visir_extent() {
        let header = sample_header();
        let trailer = sample_trailer();
        let resolver = GeolocationResolver::new(&header, &trailer, true);
        let extent = resolver.area_extent(Channel::Ir108).unwrap().single().unwrap();

        let step = f64::from(3.000_403_2f32) * 1000.0;
        assert_relative_eq!(extent.ll_x, 1855.5 * step, epsilon = 1e-6);
        assert_relative_eq!(extent.ll_y, 1856.5 * step, epsilon = 1e-6);
        assert_relative_eq!(extent.ur_x, -1856.5 * step, epsilon = 1e-6);
        assert_relative_eq!(extent.ur_y, -1855.5 * step, epsilon = 1e-6);
    }

    #[test]
    fn test_full_disk_hrv_is_split() {
        let header = sample_header();
        let trailer = sample_trailer();
        let resolver = GeolocationResolver::new(&header, &trailer, true);
        match resolver.area_extent(Channel::Hrv).unwrap() {
            AreaExtentKind::Split { upper, lower } => {
                assert_eq!((lower.lines, lower.columns), (8064, 5568));
                assert_eq!((upper.lines, upper.columns), (3072, 5568));
                let step = f64::from(1.000_134_4f32) * 1000.0;
                assert_relative_eq!(lower.extent.ll_x, (5566.0 - 2064.0 + 0.5) * step, epsilon = 1e-6);
                assert_relative_eq!(upper.extent.ur_y, (8065.0 - 5566.0 - 0.5) * step, epsilon = 1e-6);
            }
            other => panic!("expected split extent, got {:?}", other),
        }
    }

    #[test]
    fn test_grid_origin_checked_after_earth_model() {
        let mut header = sample_header();
        header.reference_grid_visir.grid_origin = 0;
        header.type_of_earth_model = 9;
        let trailer = sample_trailer();
        let resolver = GeolocationResolver::new(&header, &trailer, true);
        match resolver.area_extent(Channel::Vis006) {
            Err(NativeError::NotImplemented(msg)) => assert!(msg.contains("Earth model")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
