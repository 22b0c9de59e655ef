//! Synthetic native files for integration tests
#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use seviri_native::core::unpack::pack10216;
use seviri_native::io::data_block::LineHeader;
use seviri_native::io::header::{ReferenceGrid, HEADER_SIZE};
use seviri_native::io::layout::HRV_SUBLINES;
use seviri_native::io::trailer::Coverage;
use seviri_native::{Channel, ChannelSet, FileHeader, LineLayout, Trailer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic test count for a pixel, 0 at the top-left corner only
pub fn count_value(channel: Channel, row: usize, column: usize) -> u16 {
    if row == 0 && column == 0 {
        return 0;
    }
    ((channel.index() * 97 + row * 13 + column * 7) % 1023 + 1) as u16
}

pub fn visir_grid() -> ReferenceGrid {
    ReferenceGrid {
        number_of_lines: 3712,
        number_of_columns: 3712,
        line_dir_grid_step: 3.000_403_2,
        column_dir_grid_step: 3.000_403_2,
        grid_origin: 2,
    }
}

pub fn hrv_grid() -> ReferenceGrid {
    ReferenceGrid {
        number_of_lines: 11136,
        number_of_columns: 11136,
        line_dir_grid_step: 1.000_134_4,
        column_dir_grid_step: 1.000_134_4,
        grid_origin: 2,
    }
}

/// 8 x 10 line region with VIS006, VIS008, IR_108 and a 24 x 32 HRV window
pub fn roi_header() -> FileHeader {
    let start = Utc.with_ymd_and_hms(2021, 6, 15, 11, 45, 10).unwrap();
    let mut main_product_header = BTreeMap::new();
    main_product_header.insert("FormatName".to_string(), "NATIVE".to_string());

    FileHeader {
        main_product_header,
        secondary_product_header: BTreeMap::new(),
        selected_band_ids: "XX______X__X".to_string(),
        north_line_selected: 1008,
        east_column_selected: 1001,
        south_line_selected: 1001,
        west_column_selected: 1010,
        number_lines_visir: 8,
        number_columns_visir: 12,
        number_lines_hrv: 24,
        number_columns_hrv: 32,
        satellite_id: 324,
        nominal_longitude: 0.0,
        true_repeat_cycle_start: start,
        plan_forward_scan_end: start + Duration::minutes(12),
        planned_repeat_cycle_end: start + Duration::minutes(15),
        type_of_projection: 1,
        longitude_of_ssp: 0.0,
        reference_grid_visir: visir_grid(),
        reference_grid_hrv: hrv_grid(),
        planned_chan_processing: [0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0],
        cal_slope: [
            0.0235, 0.0303, 0.0234, 0.0037, 0.0081, 0.0221, 0.0373, 0.0308, 0.2051, 0.2042,
            0.1589, 0.0294,
        ],
        cal_offset: [
            -1.1985, -1.5453, -1.1934, -0.1887, -0.4131, -1.1271, -1.9023, -1.5708, -10.4601,
            -10.4142, -8.1039, -1.4994,
        ],
        gsics_cal_coeff: [
            0.0, 0.0, 0.0, 0.0038, 0.0082, 0.0222, 0.0374, 0.0309, 0.2060, 0.2043, 0.1590,
            0.0,
        ],
        gsics_offset_count: [
            0.0, 0.0, 0.0, -51.0, -51.0, -51.0, -51.0, -51.0, -50.0, -51.0, -51.0, 0.0,
        ],
        type_of_earth_model: 2,
        equatorial_radius: 6378.169,
        north_polar_radius: 6356.5838,
        south_polar_radius: 6356.5838,
    }
}

/// Full disk header carrying IR_108 and HRV
pub fn full_disk_header() -> FileHeader {
    FileHeader {
        selected_band_ids: "________X__X".to_string(),
        north_line_selected: 3712,
        east_column_selected: 1,
        south_line_selected: 1,
        west_column_selected: 3712,
        number_lines_visir: 3712,
        number_columns_visir: 3712,
        number_lines_hrv: 11136,
        number_columns_hrv: 11136,
        ..roi_header()
    }
}

pub fn trailer_for(header: &FileHeader) -> Trailer {
    Trailer {
        satellite_id: header.satellite_id,
        nominal_image_scanning: true,
        reduced_scan: false,
        forward_scan_start: header.true_repeat_cycle_start,
        forward_scan_end: header.plan_forward_scan_end,
        coverage_visir: Coverage {
            south_line: header.south_line_selected,
            north_line: header.north_line_selected,
            east_column: header.east_column_selected,
            west_column: header.west_column_selected,
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

/// Header, line records filled with [`count_value`], and trailer
pub fn write_native(dir: &Path, name: &str, header: &FileHeader, trailer: &Trailer) -> PathBuf {
    let channels = ChannelSet::from_selection(&header.selected_band_ids).unwrap();
    let layout = LineLayout::resolve(header, &channels).unwrap();
    let path = dir.join(name);
    let mut out = BufWriter::new(File::create(&path).unwrap());

    out.write_all(&header.encode().unwrap()).unwrap();
    for line in 0..layout.number_of_lines {
        for channel in channels.visir_channels() {
            let samples: Vec<u16> = (0..layout.visir_columns)
                .map(|col| count_value(channel, line, col))
                .collect();
            write_subrecord(&mut out, header, channel, line, &samples);
        }
        if layout.has_hrv {
            for k in 0..HRV_SUBLINES {
                let row = line * HRV_SUBLINES + k;
                let samples: Vec<u16> = (0..layout.hrv_columns)
                    .map(|col| count_value(Channel::Hrv, row, col))
                    .collect();
                write_subrecord(&mut out, header, Channel::Hrv, row, &samples);
            }
        }
    }
    out.write_all(&trailer.encode().unwrap()).unwrap();
    out.flush().unwrap();
    path
}

fn write_subrecord<W: Write>(
    out: &mut W,
    header: &FileHeader,
    channel: Channel,
    line: usize,
    samples: &[u16],
) {
    let line_header = LineHeader {
        version: 1,
        satellite_id: header.satellite_id,
        line_number: line as u32 + 1,
        channel_id: channel.index() as u8 + 1,
        line_validity: 3,
        radiometric_quality: 4,
        geometric_quality: 4,
        ..LineHeader::default()
    };
    out.write_all(&line_header.encode().unwrap()).unwrap();
    out.write_all(&pack10216(samples).unwrap()).unwrap();
}

/// Header and trailer around an all-zero (sparse) data block
pub fn write_sparse_native(
    dir: &Path,
    name: &str,
    header: &FileHeader,
    trailer: &Trailer,
) -> PathBuf {
    let channels = ChannelSet::from_selection(&header.selected_band_ids).unwrap();
    let layout = LineLayout::resolve(header, &channels).unwrap();
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();

    let header_bytes = header.encode().unwrap();
    assert_eq!(header_bytes.len(), HEADER_SIZE);
    file.write_all(&header_bytes).unwrap();
    file.set_len(layout.trailer_offset() as u64).unwrap();
    file.seek(SeekFrom::Start(layout.trailer_offset() as u64)).unwrap();
    file.write_all(&trailer.encode().unwrap()).unwrap();
    path
}
