//! Per-line record layout of the data block.
//!
//! Every scan line is stored as one record holding, in order, one sub-record
//! per present standard channel followed by three HRV sub-records when HRV is
//! present. Each sub-record is a 65 byte prefix (packet header plus line
//! metadata) and the 10-bit packed pixels of that line.

use crate::io::channels::ChannelSet;
use crate::io::header::{FileHeader, HEADER_SIZE};
use crate::types::{NativeError, NativeResult, VISIR_NUM_COLUMNS, VISIR_NUM_LINES};

/// Packet header (GP_PK_HEADER + GP_PK_SH1) preceding every sub-record
pub const PACKET_HEADER_SIZE: usize = 38;
/// Line metadata between the packet header and the pixel payload
pub const LINE_METADATA_SIZE: usize = 27;
/// Bytes before the pixel payload of every sub-record
pub const LINE_PREFIX_SIZE: usize = PACKET_HEADER_SIZE + LINE_METADATA_SIZE;

/// HRV sub-records per scan line
pub const HRV_SUBLINES: usize = 3;

/// Columns after padding to a multiple of four
pub fn padded_columns(columns: usize) -> usize {
    columns + (4 - columns % 4) % 4
}

/// Payload bytes for `columns` 10-bit samples: ceil(columns * 1.25)
pub fn packed_width(columns: usize) -> usize {
    (columns * 10 + 7) / 8
}

/// Immutable layout descriptor derived from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLayout {
    /// Standard channels per record
    pub visir_channels: usize,
    /// Columns of every standard channel, padded to a multiple of four
    pub visir_columns: usize,
    pub number_of_lines: usize,
    pub has_hrv: bool,
    pub hrv_columns: usize,
    pub hrv_number_of_lines: usize,
    pub is_full_disk: bool,
}

impl LineLayout {
    /// Derive the layout from the selected rectangle and channel set.
    ///
    /// A header `NumberColumnsVISIR` that disagrees with the computed column
    /// count is logged and otherwise ignored.
    pub fn resolve(header: &FileHeader, channels: &ChannelSet) -> NativeResult<Self> {
        let ncolumns = selection_extent(
            header.west_column_selected,
            header.east_column_selected,
            "columns",
        )?;
        let nrows = selection_extent(
            header.north_line_selected,
            header.south_line_selected,
            "lines",
        )?;

        let is_full_disk = nrows >= VISIR_NUM_LINES && ncolumns >= VISIR_NUM_COLUMNS;

        // Products with a column count that is not a multiple of four are padded
        let visir_columns = padded_columns(ncolumns);

        let visir_columns_hdr = header.number_columns_visir;
        if i64::from(visir_columns_hdr) != visir_columns as i64 {
            log::warn!("Number of VISIR columns from the header is incorrect!");
            log::warn!("Header: {}", visir_columns_hdr);
            log::warn!("Calculated: = {}", visir_columns);
        }

        let number_of_lines = non_negative(header.number_lines_visir, "NumberLinesVISIR")?;

        let has_hrv = channels.has_hrv();
        let (hrv_columns, hrv_number_of_lines) = if has_hrv {
            let hrv_columns_hdr = non_negative(header.number_columns_hrv, "NumberColumnsHRV")?;
            // A region narrower than the disk maps 1:1 onto the HRV window width
            let hrv_columns = if ncolumns < VISIR_NUM_COLUMNS {
                hrv_columns_hdr
            } else if hrv_columns_hdr % 2 != 0 {
                return Err(NativeError::InvalidFormat(format!(
                    "Odd HRV column count {} for a full width file",
                    hrv_columns_hdr
                )));
            } else {
                hrv_columns_hdr / 2
            };
            (
                hrv_columns,
                non_negative(header.number_lines_hrv, "NumberLinesHRV")?,
            )
        } else {
            (0, 0)
        };

        let layout = Self {
            visir_channels: channels.visir_channels().len(),
            visir_columns,
            number_of_lines,
            has_hrv,
            hrv_columns,
            hrv_number_of_lines,
            is_full_disk,
        };
        layout.checked_trailer_offset()?;

        log::debug!(
            "Line layout: {} lines, {} VISIR channels x {} columns, HRV {} columns, record {} bytes",
            layout.number_of_lines,
            layout.visir_channels,
            layout.visir_columns,
            layout.hrv_columns,
            layout.record_size()
        );

        Ok(layout)
    }

    pub fn visir_packed_width(&self) -> usize {
        packed_width(self.visir_columns)
    }

    pub fn hrv_packed_width(&self) -> usize {
        packed_width(self.hrv_columns)
    }

    pub fn visir_subrecord_size(&self) -> usize {
        LINE_PREFIX_SIZE + self.visir_packed_width()
    }

    pub fn hrv_subrecord_size(&self) -> usize {
        LINE_PREFIX_SIZE + self.hrv_packed_width()
    }

    /// Trailer offset, `None` when any size on the way overflows
    fn checked_data_end(&self) -> Option<usize> {
        let visir = checked_packed_width(self.visir_columns)?.checked_add(LINE_PREFIX_SIZE)?;
        let hrv = if self.has_hrv {
            checked_packed_width(self.hrv_columns)?
                .checked_add(LINE_PREFIX_SIZE)?
                .checked_mul(HRV_SUBLINES)?
        } else {
            0
        };
        let record = self.visir_channels.checked_mul(visir)?.checked_add(hrv)?;
        let data = record.checked_mul(self.number_of_lines)?;
        data.checked_add(HEADER_SIZE)
    }

    /// Trailer offset, or `InvalidFormat` when the line records cannot be addressed
    pub fn checked_trailer_offset(&self) -> NativeResult<usize> {
        self.checked_data_end().ok_or_else(|| {
            NativeError::InvalidFormat(format!(
                "{} line records of {} VISIR x {} columns and {} HRV columns overflow the file size",
                self.number_of_lines, self.visir_channels, self.visir_columns, self.hrv_columns
            ))
        })
    }

    /// Bytes of one complete scan line record.
    ///
    /// The size methods assume a layout from [`LineLayout::resolve`], which
    /// rejects layouts whose sizes overflow.
    pub fn record_size(&self) -> usize {
        let hrv = if self.has_hrv {
            HRV_SUBLINES * self.hrv_subrecord_size()
        } else {
            0
        };
        self.visir_channels * self.visir_subrecord_size() + hrv
    }

    pub fn data_size(&self) -> usize {
        self.record_size() * self.number_of_lines
    }

    /// The trailer follows the header and all line records
    pub fn trailer_offset(&self) -> usize {
        HEADER_SIZE + self.data_size()
    }

    /// Offset of a standard channel sub-record within a line record
    pub fn visir_subrecord_offset(&self, slot: usize) -> usize {
        slot * self.visir_subrecord_size()
    }

    /// Offset of an HRV sub-record within a line record
    pub fn hrv_subrecord_offset(&self, subline: usize) -> usize {
        self.visir_channels * self.visir_subrecord_size() + subline * self.hrv_subrecord_size()
    }
}

fn checked_packed_width(columns: usize) -> Option<usize> {
    Some(columns.checked_mul(10)?.checked_add(7)? / 8)
}

fn selection_extent(high: i32, low: i32, what: &str) -> NativeResult<usize> {
    let extent = i64::from(high) - i64::from(low) + 1;
    if extent <= 0 {
        return Err(NativeError::InvalidFormat(format!(
            "Selected rectangle has {} {}",
            extent, what
        )));
    }
    Ok(extent as usize)
}

fn non_negative(value: i32, name: &str) -> NativeResult<usize> {
    usize::try_from(value)
        .map_err(|_| NativeError::InvalidFormat(format!("Negative {}: {}", name, value)))
}
