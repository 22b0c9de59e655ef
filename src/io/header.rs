//! Level 1.5 native file header.
//!
//! This is a simplified, compact layout that carries only the fields the
//! reader consumes. It keeps the section names and field paths of the
//! EUMETSAT native format, but the full operational header (about 450 kB of
//! nested records) is not decoded, so operational files do not open.
//!
//! The header sits at offset 0 and has three fixed-size sections:
//!
//! | Section                      | Offset | Size | Encoding                     |
//! |------------------------------|--------|------|------------------------------|
//! | 15_MAIN_PRODUCT_HEADER       | 0      | 640  | 8 text records               |
//! | 15_SECONDARY_PRODUCT_HEADER  | 640    | 1440 | 18 text records              |
//! | 15_DATA_HEADER               | 2080   | 832  | big-endian binary, see below |
//!
//! Data header sub-sections (offsets relative to 2080):
//!
//! | Sub-section                  | Offset | Size |
//! |------------------------------|--------|------|
//! | SatelliteStatus              | 0      | 64   |
//! | ImageAcquisition             | 64     | 64   |
//! | ImageDescription             | 128    | 128  |
//! | RadiometricProcessing        | 256    | 512  |
//! | GeometricProcessing          | 768    | 64   |
//!
//! The decoded [`FileHeader`] is flat; each field documents the nested
//! path it comes from.

use crate::io::record::{
    pad_section, read_cds_expanded, read_text_record, require_len, seek_section,
    write_cds_expanded, write_text_record, TEXT_RECORD_LEN,
};
use crate::types::{NativeError, NativeResult, ProjectionParameters, SATELLITE_ALTITUDE};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

pub const MAIN_PRODUCT_HEADER_RECORDS: [&str; 8] = [
    "FormatName",
    "FormatDocumentName",
    "FormatDocumentMajorVersion",
    "FormatDocumentMinorVersion",
    "CreationDateTime",
    "CreatingCentre",
    "DataSetIdentification",
    "TotalFileSize",
];

pub const SECONDARY_PRODUCT_HEADER_RECORDS: [&str; 18] = [
    "ABID",
    "SMOD",
    "APXS",
    "AVPA",
    "LSCD",
    "LMAP",
    "QDLC",
    "QDLP",
    "QQAI",
    "SelectedBandIDs",
    "SouthLineSelectedRectangle",
    "NorthLineSelectedRectangle",
    "EastColumnSelectedRectangle",
    "WestColumnSelectedRectangle",
    "NumberLinesVISIR",
    "NumberColumnsVISIR",
    "NumberLinesHRV",
    "NumberColumnsHRV",
];

pub const MAIN_PRODUCT_HEADER_OFFSET: usize = 0;
pub const SECONDARY_PRODUCT_HEADER_OFFSET: usize =
    MAIN_PRODUCT_HEADER_OFFSET + MAIN_PRODUCT_HEADER_RECORDS.len() * TEXT_RECORD_LEN;
pub const DATA_HEADER_OFFSET: usize =
    SECONDARY_PRODUCT_HEADER_OFFSET + SECONDARY_PRODUCT_HEADER_RECORDS.len() * TEXT_RECORD_LEN;

const SATELLITE_STATUS_OFFSET: usize = DATA_HEADER_OFFSET;
const IMAGE_ACQUISITION_OFFSET: usize = SATELLITE_STATUS_OFFSET + 64;
const IMAGE_DESCRIPTION_OFFSET: usize = IMAGE_ACQUISITION_OFFSET + 64;
const RADIOMETRIC_PROCESSING_OFFSET: usize = IMAGE_DESCRIPTION_OFFSET + 128;
const GEOMETRIC_PROCESSING_OFFSET: usize = RADIOMETRIC_PROCESSING_OFFSET + 512;

/// Total size of the header record
pub const HEADER_SIZE: usize = GEOMETRIC_PROCESSING_OFFSET + 64;

/// Number of channels covered by every per-channel header table
pub const NUM_CHANNELS: usize = 12;

/// ImageDescription/ReferenceGrid{VIS_IR,HRV}
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceGrid {
    pub number_of_lines: i32,
    pub number_of_columns: i32,
    /// km
    pub line_dir_grid_step: f32,
    /// km
    pub column_dir_grid_step: f32,
    /// 0 = NW, 1 = SW, 2 = SE, 3 = NE
    pub grid_origin: u8,
}

impl ReferenceGrid {
    fn read(cursor: &mut Cursor<&[u8]>) -> NativeResult<Self> {
        Ok(Self {
            number_of_lines: cursor.read_i32::<BigEndian>()?,
            number_of_columns: cursor.read_i32::<BigEndian>()?,
            line_dir_grid_step: cursor.read_f32::<BigEndian>()?,
            column_dir_grid_step: cursor.read_f32::<BigEndian>()?,
            grid_origin: cursor.read_u8()?,
        })
    }

    fn write(&self, buf: &mut Vec<u8>) -> NativeResult<()> {
        buf.write_i32::<BigEndian>(self.number_of_lines)?;
        buf.write_i32::<BigEndian>(self.number_of_columns)?;
        buf.write_f32::<BigEndian>(self.line_dir_grid_step)?;
        buf.write_f32::<BigEndian>(self.column_dir_grid_step)?;
        buf.write_u8(self.grid_origin)?;
        Ok(())
    }
}

/// Decoded Level 1.5 header
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// 15_MAIN_PRODUCT_HEADER, all records by name
    pub main_product_header: BTreeMap<String, String>,
    /// 15_SECONDARY_PRODUCT_HEADER, all records by name (raw text)
    pub secondary_product_header: BTreeMap<String, String>,

    /// 15_SECONDARY_PRODUCT_HEADER/SelectedBandIDs
    pub selected_band_ids: String,
    /// 15_SECONDARY_PRODUCT_HEADER/NorthLineSelectedRectangle
    pub north_line_selected: i32,
    /// 15_SECONDARY_PRODUCT_HEADER/EastColumnSelectedRectangle
    pub east_column_selected: i32,
    /// 15_SECONDARY_PRODUCT_HEADER/SouthLineSelectedRectangle
    pub south_line_selected: i32,
    /// 15_SECONDARY_PRODUCT_HEADER/WestColumnSelectedRectangle
    pub west_column_selected: i32,
    /// 15_SECONDARY_PRODUCT_HEADER/NumberLinesVISIR
    pub number_lines_visir: i32,
    /// 15_SECONDARY_PRODUCT_HEADER/NumberColumnsVISIR (informational only)
    pub number_columns_visir: i32,
    /// 15_SECONDARY_PRODUCT_HEADER/NumberLinesHRV
    pub number_lines_hrv: i32,
    /// 15_SECONDARY_PRODUCT_HEADER/NumberColumnsHRV
    pub number_columns_hrv: i32,

    /// 15_DATA_HEADER/SatelliteStatus/SatelliteDefinition/SatelliteId
    pub satellite_id: u16,
    /// 15_DATA_HEADER/SatelliteStatus/SatelliteDefinition/NominalLongitude
    pub nominal_longitude: f32,

    /// 15_DATA_HEADER/ImageAcquisition/PlannedAcquisitionTime/TrueRepeatCycleStart
    pub true_repeat_cycle_start: DateTime<Utc>,
    /// 15_DATA_HEADER/ImageAcquisition/PlannedAcquisitionTime/PlanForwardScanEnd
    pub plan_forward_scan_end: DateTime<Utc>,
    /// 15_DATA_HEADER/ImageAcquisition/PlannedAcquisitionTime/PlannedRepeatCycleEnd
    pub planned_repeat_cycle_end: DateTime<Utc>,

    /// 15_DATA_HEADER/ImageDescription/ProjectionDescription/TypeOfProjection
    pub type_of_projection: u8,
    /// 15_DATA_HEADER/ImageDescription/ProjectionDescription/LongitudeOfSSP
    pub longitude_of_ssp: f32,
    /// 15_DATA_HEADER/ImageDescription/ReferenceGridVIS_IR
    pub reference_grid_visir: ReferenceGrid,
    /// 15_DATA_HEADER/ImageDescription/ReferenceGridHRV
    pub reference_grid_hrv: ReferenceGrid,
    /// 15_DATA_HEADER/ImageDescription/Level15ImageProduction/PlannedChanProcessing
    pub planned_chan_processing: [u8; NUM_CHANNELS],

    /// 15_DATA_HEADER/RadiometricProcessing/Level15ImageCalibration/CalSlope
    pub cal_slope: [f64; NUM_CHANNELS],
    /// 15_DATA_HEADER/RadiometricProcessing/Level15ImageCalibration/CalOffset
    pub cal_offset: [f64; NUM_CHANNELS],
    /// 15_DATA_HEADER/RadiometricProcessing/MPEFCalFeedback/GSICSCalCoeff
    pub gsics_cal_coeff: [f64; NUM_CHANNELS],
    /// 15_DATA_HEADER/RadiometricProcessing/MPEFCalFeedback/GSICSOffsetCount
    pub gsics_offset_count: [f64; NUM_CHANNELS],

    /// 15_DATA_HEADER/GeometricProcessing/EarthModel/TypeOfEarthModel
    pub type_of_earth_model: u8,
    /// 15_DATA_HEADER/GeometricProcessing/EarthModel/EquatorialRadius (km)
    pub equatorial_radius: f64,
    /// 15_DATA_HEADER/GeometricProcessing/EarthModel/NorthPolarRadius (km)
    pub north_polar_radius: f64,
    /// 15_DATA_HEADER/GeometricProcessing/EarthModel/SouthPolarRadius (km)
    pub south_polar_radius: f64,
}

impl FileHeader {
    /// Read the header record at the start of a native file
    pub fn read<P: AsRef<Path>>(path: P) -> NativeResult<Self> {
        let path = path.as_ref();
        log::debug!("Reading {} byte header from {}", HEADER_SIZE, path.display());

        let mut file = File::open(path)?;
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        file.by_ref()
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut buf)?;

        Self::decode(&buf)
    }

    /// Decode a header from the first `HEADER_SIZE` bytes of `bytes`
    pub fn decode(bytes: &[u8]) -> NativeResult<Self> {
        require_len(bytes, HEADER_SIZE, "header")?;
        let mut cursor = Cursor::new(&bytes[..HEADER_SIZE]);

        seek_section(&mut cursor, MAIN_PRODUCT_HEADER_OFFSET);
        let mut main_product_header = BTreeMap::new();
        for _ in 0..MAIN_PRODUCT_HEADER_RECORDS.len() {
            let (name, value) = read_text_record(&mut cursor)?;
            main_product_header.insert(name, value);
        }

        seek_section(&mut cursor, SECONDARY_PRODUCT_HEADER_OFFSET);
        let mut secondary_product_header = BTreeMap::new();
        for _ in 0..SECONDARY_PRODUCT_HEADER_RECORDS.len() {
            let (name, value) = read_text_record(&mut cursor)?;
            secondary_product_header.insert(name, value);
        }
        let sec = &secondary_product_header;

        seek_section(&mut cursor, SATELLITE_STATUS_OFFSET);
        let satellite_id = cursor.read_u16::<BigEndian>()?;
        let nominal_longitude = cursor.read_f32::<BigEndian>()?;

        seek_section(&mut cursor, IMAGE_ACQUISITION_OFFSET);
        let true_repeat_cycle_start = read_cds_expanded(&mut cursor)?;
        let plan_forward_scan_end = read_cds_expanded(&mut cursor)?;
        let planned_repeat_cycle_end = read_cds_expanded(&mut cursor)?;

        seek_section(&mut cursor, IMAGE_DESCRIPTION_OFFSET);
        let type_of_projection = cursor.read_u8()?;
        let longitude_of_ssp = cursor.read_f32::<BigEndian>()?;
        let reference_grid_visir = ReferenceGrid::read(&mut cursor)?;
        let reference_grid_hrv = ReferenceGrid::read(&mut cursor)?;
        let mut planned_chan_processing = [0u8; NUM_CHANNELS];
        cursor.read_exact(&mut planned_chan_processing)?;

        seek_section(&mut cursor, RADIOMETRIC_PROCESSING_OFFSET);
        let mut cal_slope = [0f64; NUM_CHANNELS];
        let mut cal_offset = [0f64; NUM_CHANNELS];
        for i in 0..NUM_CHANNELS {
            cal_slope[i] = cursor.read_f64::<BigEndian>()?;
            cal_offset[i] = cursor.read_f64::<BigEndian>()?;
        }
        let mut gsics_cal_coeff = [0f64; NUM_CHANNELS];
        cursor.read_f64_into::<BigEndian>(&mut gsics_cal_coeff)?;
        let mut gsics_offset_count = [0f64; NUM_CHANNELS];
        cursor.read_f64_into::<BigEndian>(&mut gsics_offset_count)?;

        seek_section(&mut cursor, GEOMETRIC_PROCESSING_OFFSET);
        let type_of_earth_model = cursor.read_u8()?;
        let equatorial_radius = cursor.read_f64::<BigEndian>()?;
        let north_polar_radius = cursor.read_f64::<BigEndian>()?;
        let south_polar_radius = cursor.read_f64::<BigEndian>()?;

        Ok(Self {
            selected_band_ids: text_value(sec, "SelectedBandIDs")?.to_string(),
            north_line_selected: int_value(sec, "NorthLineSelectedRectangle")?,
            east_column_selected: int_value(sec, "EastColumnSelectedRectangle")?,
            south_line_selected: int_value(sec, "SouthLineSelectedRectangle")?,
            west_column_selected: int_value(sec, "WestColumnSelectedRectangle")?,
            number_lines_visir: int_value(sec, "NumberLinesVISIR")?,
            number_columns_visir: int_value(sec, "NumberColumnsVISIR")?,
            number_lines_hrv: int_value(sec, "NumberLinesHRV")?,
            number_columns_hrv: int_value(sec, "NumberColumnsHRV")?,
            main_product_header,
            secondary_product_header,
            satellite_id,
            nominal_longitude,
            true_repeat_cycle_start,
            plan_forward_scan_end,
            planned_repeat_cycle_end,
            type_of_projection,
            longitude_of_ssp,
            reference_grid_visir,
            reference_grid_hrv,
            planned_chan_processing,
            cal_slope,
            cal_offset,
            gsics_cal_coeff,
            gsics_offset_count,
            type_of_earth_model,
            equatorial_radius,
            north_polar_radius,
            south_polar_radius,
        })
    }

    /// Encode the header into exactly `HEADER_SIZE` bytes.
    ///
    /// Typed secondary header fields take precedence over the raw
    /// `secondary_product_header` map.
    pub fn encode(&self) -> NativeResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);

        for name in MAIN_PRODUCT_HEADER_RECORDS {
            let value = self
                .main_product_header
                .get(name)
                .map(String::as_str)
                .unwrap_or("");
            write_text_record(&mut buf, name, value)?;
        }
        pad_section(&mut buf, SECONDARY_PRODUCT_HEADER_OFFSET)?;

        for name in SECONDARY_PRODUCT_HEADER_RECORDS {
            let value = match name {
                "SelectedBandIDs" => self.selected_band_ids.clone(),
                "NorthLineSelectedRectangle" => self.north_line_selected.to_string(),
                "EastColumnSelectedRectangle" => self.east_column_selected.to_string(),
                "SouthLineSelectedRectangle" => self.south_line_selected.to_string(),
                "WestColumnSelectedRectangle" => self.west_column_selected.to_string(),
                "NumberLinesVISIR" => self.number_lines_visir.to_string(),
                "NumberColumnsVISIR" => self.number_columns_visir.to_string(),
                "NumberLinesHRV" => self.number_lines_hrv.to_string(),
                "NumberColumnsHRV" => self.number_columns_hrv.to_string(),
                other => self
                    .secondary_product_header
                    .get(other)
                    .cloned()
                    .unwrap_or_default(),
            };
            write_text_record(&mut buf, name, &value)?;
        }
        pad_section(&mut buf, SATELLITE_STATUS_OFFSET)?;

        buf.write_u16::<BigEndian>(self.satellite_id)?;
        buf.write_f32::<BigEndian>(self.nominal_longitude)?;
        pad_section(&mut buf, IMAGE_ACQUISITION_OFFSET)?;

        write_cds_expanded(&mut buf, &self.true_repeat_cycle_start)?;
        write_cds_expanded(&mut buf, &self.plan_forward_scan_end)?;
        write_cds_expanded(&mut buf, &self.planned_repeat_cycle_end)?;
        pad_section(&mut buf, IMAGE_DESCRIPTION_OFFSET)?;

        buf.write_u8(self.type_of_projection)?;
        buf.write_f32::<BigEndian>(self.longitude_of_ssp)?;
        self.reference_grid_visir.write(&mut buf)?;
        self.reference_grid_hrv.write(&mut buf)?;
        buf.extend_from_slice(&self.planned_chan_processing);
        pad_section(&mut buf, RADIOMETRIC_PROCESSING_OFFSET)?;

        for i in 0..NUM_CHANNELS {
            buf.write_f64::<BigEndian>(self.cal_slope[i])?;
            buf.write_f64::<BigEndian>(self.cal_offset[i])?;
        }
        for value in self.gsics_cal_coeff.iter().chain(&self.gsics_offset_count) {
            buf.write_f64::<BigEndian>(*value)?;
        }
        pad_section(&mut buf, GEOMETRIC_PROCESSING_OFFSET)?;

        buf.write_u8(self.type_of_earth_model)?;
        buf.write_f64::<BigEndian>(self.equatorial_radius)?;
        buf.write_f64::<BigEndian>(self.north_polar_radius)?;
        buf.write_f64::<BigEndian>(self.south_polar_radius)?;
        pad_section(&mut buf, HEADER_SIZE)?;

        Ok(buf)
    }

    /// Geostationary projection parameters in meters
    pub fn projection_parameters(&self) -> ProjectionParameters {
        let polar_radius = (self.north_polar_radius + self.south_polar_radius) * 0.5;
        ProjectionParameters {
            a: self.equatorial_radius * 1000.0,
            b: polar_radius * 1000.0,
            h: SATELLITE_ALTITUDE,
            ssp_longitude: f64::from(self.longitude_of_ssp),
        }
    }
}

fn text_value<'a>(records: &'a BTreeMap<String, String>, name: &str) -> NativeResult<&'a str> {
    records
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| NativeError::InvalidFormat(format!("Missing header record {}", name)))
}

fn int_value(records: &BTreeMap<String, String>, name: &str) -> NativeResult<i32> {
    let value = text_value(records, name)?;
    value.trim().parse::<i32>().map_err(|e| {
        NativeError::InvalidFormat(format!("Invalid value '{}' for {}: {}", value, name, e))
    })
}
