//! Memory-mapped view of the line records between header and trailer

use crate::core::unpack::{dec10216_into, PACKED_GROUP_BYTES, SAMPLES_PER_GROUP};
use crate::io::header::HEADER_SIZE;
use crate::io::layout::{
    LineLayout, HRV_SUBLINES, LINE_METADATA_SIZE, LINE_PREFIX_SIZE, PACKET_HEADER_SIZE,
};
use crate::types::{CountImage, NativeError, NativeResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use memmap2::{Mmap, MmapOptions};
use ndarray::Array2;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

/// Metadata at the start of every line sub-record (after the packet header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineHeader {
    pub version: u8,
    pub satellite_id: u16,
    pub time: [u16; 5],
    pub line_number: u32,
    pub channel_id: u8,
    pub acquisition_time: [u16; 3],
    pub line_validity: u8,
    pub radiometric_quality: u8,
    pub geometric_quality: u8,
}

impl LineHeader {
    /// Decode from a sub-record prefix (`LINE_PREFIX_SIZE` bytes)
    pub fn decode(prefix: &[u8]) -> NativeResult<Self> {
        if prefix.len() < LINE_PREFIX_SIZE {
            return Err(NativeError::InvalidFormat(format!(
                "Line prefix of {} bytes, expected {}",
                prefix.len(),
                LINE_PREFIX_SIZE
            )));
        }
        let mut cursor = Cursor::new(&prefix[PACKET_HEADER_SIZE..LINE_PREFIX_SIZE]);

        let version = cursor.read_u8()?;
        let satellite_id = cursor.read_u16::<BigEndian>()?;
        let mut time = [0u16; 5];
        cursor.read_u16_into::<BigEndian>(&mut time)?;
        let line_number = cursor.read_u32::<BigEndian>()?;
        let channel_id = cursor.read_u8()?;
        let mut acquisition_time = [0u16; 3];
        cursor.read_u16_into::<BigEndian>(&mut acquisition_time)?;

        Ok(Self {
            version,
            satellite_id,
            time,
            line_number,
            channel_id,
            acquisition_time,
            line_validity: cursor.read_u8()?,
            radiometric_quality: cursor.read_u8()?,
            geometric_quality: cursor.read_u8()?,
        })
    }

    /// Encode as a full sub-record prefix with a zeroed packet header
    pub fn encode(&self) -> NativeResult<Vec<u8>> {
        let mut buf = vec![0u8; PACKET_HEADER_SIZE];
        buf.write_u8(self.version)?;
        buf.write_u16::<BigEndian>(self.satellite_id)?;
        for t in self.time {
            buf.write_u16::<BigEndian>(t)?;
        }
        buf.write_u32::<BigEndian>(self.line_number)?;
        buf.write_u8(self.channel_id)?;
        for t in self.acquisition_time {
            buf.write_u16::<BigEndian>(t)?;
        }
        buf.write_u8(self.line_validity)?;
        buf.write_u8(self.radiometric_quality)?;
        buf.write_u8(self.geometric_quality)?;
        debug_assert_eq!(buf.len(), PACKET_HEADER_SIZE + LINE_METADATA_SIZE);
        Ok(buf)
    }
}

/// Which sub-record of a line to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubRecord {
    /// Standard channel slot (position among present non-HRV channels)
    Visir(usize),
    /// One of the three HRV sub-lines
    Hrv(usize),
}

/// Read-only view over the raw line records.
///
/// The file handle is released once the mapping exists.
pub struct DataBlockView {
    mmap: Mmap,
    layout: LineLayout,
}

impl DataBlockView {
    pub fn open<P: AsRef<Path>>(path: P, layout: LineLayout) -> NativeResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let required = layout.checked_trailer_offset()? as u64;
        if file_len < required {
            return Err(NativeError::InvalidFormat(format!(
                "File {} is {} bytes, data block needs {}",
                path.display(),
                file_len,
                required
            )));
        }

        if layout.data_size() == 0 {
            // Zero-length mappings are rejected by the OS
            let mmap = MmapOptions::new().len(1).map_anon()?.make_read_only()?;
            return Ok(Self { mmap, layout });
        }

        // SAFETY: the mapping is read-only and the file is not modified while mapped
        let mmap = unsafe {
            MmapOptions::new()
                .offset(HEADER_SIZE as u64)
                .len(layout.data_size())
                .map(&file)?
        };
        log::debug!(
            "Mapped {} lines x {} bytes from {}",
            layout.number_of_lines,
            layout.record_size(),
            path.display()
        );

        Ok(Self { mmap, layout })
    }

    pub fn layout(&self) -> &LineLayout {
        &self.layout
    }

    pub fn number_of_lines(&self) -> usize {
        self.layout.number_of_lines
    }

    /// One complete line record
    pub fn record(&self, line: usize) -> NativeResult<&[u8]> {
        if line >= self.layout.number_of_lines {
            return Err(NativeError::Processing(format!(
                "Line {} out of range (0..{})",
                line, self.layout.number_of_lines
            )));
        }
        let size = self.layout.record_size();
        Ok(&self.mmap[line * size..(line + 1) * size])
    }

    fn subrecord(&self, line: usize, sub: SubRecord) -> NativeResult<&[u8]> {
        let record = self.record(line)?;
        let (offset, size) = match sub {
            SubRecord::Visir(slot) if slot < self.layout.visir_channels => (
                self.layout.visir_subrecord_offset(slot),
                self.layout.visir_subrecord_size(),
            ),
            SubRecord::Hrv(subline) if self.layout.has_hrv && subline < HRV_SUBLINES => (
                self.layout.hrv_subrecord_offset(subline),
                self.layout.hrv_subrecord_size(),
            ),
            other => {
                return Err(NativeError::Processing(format!(
                    "Sub-record {:?} not present in line records",
                    other
                )))
            }
        };
        Ok(&record[offset..offset + size])
    }

    pub fn line_header(&self, line: usize, sub: SubRecord) -> NativeResult<LineHeader> {
        LineHeader::decode(self.subrecord(line, sub)?)
    }

    /// Packed pixel payload of one sub-record
    pub fn payload(&self, line: usize, sub: SubRecord) -> NativeResult<&[u8]> {
        Ok(&self.subrecord(line, sub)?[LINE_PREFIX_SIZE..])
    }

    /// Unpack one standard channel into a (lines x columns) count image
    pub fn read_visir(&self, slot: usize, chunk_lines: usize) -> NativeResult<CountImage> {
        self.unpack_rows(
            self.layout.number_of_lines,
            self.layout.visir_columns,
            chunk_lines,
            |row| (row, SubRecord::Visir(slot)),
        )
    }

    /// Unpack HRV, interleaving the three sub-lines of every record.
    ///
    /// Output row `3 * i + k` is sub-line `k` of line record `i`.
    pub fn read_hrv(&self, chunk_lines: usize) -> NativeResult<CountImage> {
        if !self.layout.has_hrv {
            return Err(NativeError::Processing(
                "HRV sub-records not present in line records".to_string(),
            ));
        }
        let rows = self.layout.number_of_lines * HRV_SUBLINES;
        if rows != self.layout.hrv_number_of_lines {
            return Err(NativeError::InvalidFormat(format!(
                "HRV has {} lines but {} line records hold {}",
                self.layout.hrv_number_of_lines, self.layout.number_of_lines, rows
            )));
        }
        self.unpack_rows(
            rows,
            self.layout.hrv_columns,
            chunk_lines.saturating_mul(HRV_SUBLINES),
            |row| (row / HRV_SUBLINES, SubRecord::Hrv(row % HRV_SUBLINES)),
        )
    }

    /// Unpack `rows` output rows, each taken from the sub-record `locate(row)`
    fn unpack_rows<F>(
        &self,
        rows: usize,
        columns: usize,
        chunk_rows: usize,
        locate: F,
    ) -> NativeResult<CountImage>
    where
        F: Fn(usize) -> (usize, SubRecord) + Sync,
    {
        if columns % SAMPLES_PER_GROUP != 0 {
            return Err(NativeError::InvalidFormat(format!(
                "{} columns do not fill whole {}-byte groups per line",
                columns, PACKED_GROUP_BYTES
            )));
        }
        let mut out = vec![0u16; rows * columns];
        if columns == 0 || rows == 0 {
            return Array2::from_shape_vec((rows, columns), out)
                .map_err(|e| NativeError::Processing(format!("Shape error: {}", e)));
        }
        // Chunks never exceed the image, so chunk_rows * columns stays in range
        let chunk_rows = chunk_rows.clamp(1, rows);

        let unpack_chunk = |(chunk_idx, chunk): (usize, &mut [u16])| -> NativeResult<()> {
            let first_row = chunk_idx * chunk_rows;
            for (i, row_out) in chunk.chunks_exact_mut(columns).enumerate() {
                let (line, sub) = locate(first_row + i);
                dec10216_into(self.payload(line, sub)?, row_out)?;
            }
            Ok(())
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            out.par_chunks_mut(chunk_rows * columns)
                .enumerate()
                .try_for_each(unpack_chunk)?;
        }
        #[cfg(not(feature = "parallel"))]
        {
            out.chunks_mut(chunk_rows * columns)
                .enumerate()
                .try_for_each(unpack_chunk)?;
        }

        Array2::from_shape_vec((rows, columns), out)
            .map_err(|e| NativeError::Processing(format!("Shape error: {}", e)))
    }
}
