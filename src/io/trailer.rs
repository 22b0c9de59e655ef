//! Level 1.5 trailer (15TRAILER/ImageProductionStats).
//!
//! Like the header, this is a simplified layout holding only the scanning
//! summary and coverage fields, not the full operational trailer. It is a
//! fixed-size big-endian record located right after the data block:
//!
//! | Field                                   | Size |
//! |-----------------------------------------|------|
//! | SatelliteId                             | 2    |
//! | ActualScanningSummary/NominalImageScanning | 1 |
//! | ActualScanningSummary/ReducedScan       | 1    |
//! | ActualScanningSummary/ForwardScanStart  | 10   |
//! | ActualScanningSummary/ForwardScanEnd    | 10   |
//! | ActualL15CoverageVIS_IR (S, N, E, W)    | 16   |
//! | ActualL15CoverageHRV lower (S, N, E, W) | 16   |
//! | ActualL15CoverageHRV upper (S, N, E, W) | 16   |
//! | reserved                                | 56   |

use crate::io::record::{pad_section, read_cds_expanded, require_len, write_cds_expanded};
use crate::types::NativeResult;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Total size of the trailer record
pub const TRAILER_SIZE: usize = 128;

/// Actual scanned bounds of one window, as line/column numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coverage {
    pub south_line: i32,
    pub north_line: i32,
    pub east_column: i32,
    pub west_column: i32,
}

impl Coverage {
    pub fn number_of_lines(&self) -> i64 {
        i64::from(self.north_line) - i64::from(self.south_line) + 1
    }

    pub fn number_of_columns(&self) -> i64 {
        i64::from(self.west_column) - i64::from(self.east_column) + 1
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> NativeResult<Self> {
        Ok(Self {
            south_line: cursor.read_i32::<BigEndian>()?,
            north_line: cursor.read_i32::<BigEndian>()?,
            east_column: cursor.read_i32::<BigEndian>()?,
            west_column: cursor.read_i32::<BigEndian>()?,
        })
    }

    fn write(&self, buf: &mut Vec<u8>) -> NativeResult<()> {
        buf.write_i32::<BigEndian>(self.south_line)?;
        buf.write_i32::<BigEndian>(self.north_line)?;
        buf.write_i32::<BigEndian>(self.east_column)?;
        buf.write_i32::<BigEndian>(self.west_column)?;
        Ok(())
    }
}

/// Decoded trailer
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    pub satellite_id: u16,
    pub nominal_image_scanning: bool,
    /// Rapid scan acquisition: only the lower HRV window is present
    pub reduced_scan: bool,
    pub forward_scan_start: DateTime<Utc>,
    pub forward_scan_end: DateTime<Utc>,
    pub coverage_visir: Coverage,
    pub coverage_hrv_lower: Coverage,
    pub coverage_hrv_upper: Coverage,
}

impl Trailer {
    /// Read the trailer at `offset`, which depends on the line layout
    pub fn read<P: AsRef<Path>>(path: P, offset: u64) -> NativeResult<Self> {
        let path = path.as_ref();
        log::debug!("Reading trailer from {} at offset {}", path.display(), offset);

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(TRAILER_SIZE);
        file.take(TRAILER_SIZE as u64).read_to_end(&mut buf)?;

        Self::decode(&buf)
    }

    pub fn decode(bytes: &[u8]) -> NativeResult<Self> {
        require_len(bytes, TRAILER_SIZE, "trailer")?;
        let mut cursor = Cursor::new(&bytes[..TRAILER_SIZE]);

        let satellite_id = cursor.read_u16::<BigEndian>()?;
        let nominal_image_scanning = cursor.read_u8()? != 0;
        let reduced_scan = cursor.read_u8()? != 0;
        let forward_scan_start = read_cds_expanded(&mut cursor)?;
        let forward_scan_end = read_cds_expanded(&mut cursor)?;
        let coverage_visir = Coverage::read(&mut cursor)?;
        let coverage_hrv_lower = Coverage::read(&mut cursor)?;
        let coverage_hrv_upper = Coverage::read(&mut cursor)?;

        Ok(Self {
            satellite_id,
            nominal_image_scanning,
            reduced_scan,
            forward_scan_start,
            forward_scan_end,
            coverage_visir,
            coverage_hrv_lower,
            coverage_hrv_upper,
        })
    }

    pub fn encode(&self) -> NativeResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(TRAILER_SIZE);
        buf.write_u16::<BigEndian>(self.satellite_id)?;
        buf.write_u8(u8::from(self.nominal_image_scanning))?;
        buf.write_u8(u8::from(self.reduced_scan))?;
        write_cds_expanded(&mut buf, &self.forward_scan_start)?;
        write_cds_expanded(&mut buf, &self.forward_scan_end)?;
        self.coverage_visir.write(&mut buf)?;
        self.coverage_hrv_lower.write(&mut buf)?;
        self.coverage_hrv_upper.write(&mut buf)?;
        pad_section(&mut buf, TRAILER_SIZE)?;
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::NativeError;
    use chrono::TimeZone;

    /// Full disk trailer with the nominal HRV windows
    pub(crate) fn sample_trailer() -> Trailer {
        let start = Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 9).unwrap();
        Trailer {
            satellite_id: 324,
            nominal_image_scanning: true,
            reduced_scan: false,
            forward_scan_start: start,
            forward_scan_end: start + chrono::Duration::minutes(12),
            coverage_visir: Coverage {
                south_line: 1,
                north_line: 3712,
                east_column: 1,
                west_column: 3712,
            },
            coverage_hrv_lower: Coverage {
                south_line: 1,
                north_line: 8064,
                east_column: 2064,
                west_column: 7631,
            },
            coverage_hrv_upper: Coverage {
                south_line: 8065,
                north_line: 11136,
                east_column: 3992,
                west_column: 9559,
            },
        }
    }

    #[test]
    fn test_trailer_encode_decode() {
        let trailer = sample_trailer();
        let bytes = trailer.encode().unwrap();
        assert_eq!(bytes.len(), TRAILER_SIZE);
        assert_eq!(Trailer::decode(&bytes).unwrap(), trailer);
    }

    #[test]
    fn test_reduced_scan_flag_position() {
        let mut trailer = sample_trailer();
        trailer.reduced_scan = true;
        let bytes = trailer.encode().unwrap();
        assert_eq!(bytes[3], 1);
        assert!(Trailer::decode(&bytes).unwrap().reduced_scan);
    }

    #[test]
    fn test_window_sizes() {
        let trailer = sample_trailer();
        assert_eq!(trailer.coverage_hrv_lower.number_of_lines(), 8064);
        assert_eq!(trailer.coverage_hrv_lower.number_of_columns(), 5568);
        assert_eq!(trailer.coverage_hrv_upper.number_of_lines(), 3072);
        assert_eq!(trailer.coverage_hrv_upper.number_of_columns(), 5568);
    }

    #[test]
    fn test_short_trailer_is_format_error() {
        let bytes = sample_trailer().encode().unwrap();
        assert!(matches!(
            Trailer::decode(&bytes[..TRAILER_SIZE - 10]),
            Err(NativeError::InvalidFormat(_))
        ));
    }
}
