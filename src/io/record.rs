//! Primitive field codecs shared by the header, trailer and line records.
//!
//! All binary fields are big-endian. Text records are fixed-width ASCII
//! name/value pairs padded with spaces (NUL padding is accepted on read).

use crate::types::{NativeError, NativeResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Duration, Utc};
use std::io::{Cursor, Read, Write};

pub const TEXT_NAME_LEN: usize = 30;
pub const TEXT_VALUE_LEN: usize = 50;
pub const TEXT_RECORD_LEN: usize = TEXT_NAME_LEN + TEXT_VALUE_LEN;

/// Size of an expanded CCSDS day-segmented time field
pub const CDS_EXPANDED_LEN: usize = 10;

/// 1958-01-01T00:00:00Z as a unix timestamp
const CDS_EPOCH_UNIX_SECONDS: i64 = -378_691_200;

fn cds_epoch() -> NativeResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(CDS_EPOCH_UNIX_SECONDS, 0)
        .ok_or_else(|| NativeError::Processing("CDS epoch out of range".to_string()))
}

fn trim_field(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Read one name/value text record
pub fn read_text_record<R: Read>(reader: &mut R) -> NativeResult<(String, String)> {
    let mut name = [0u8; TEXT_NAME_LEN];
    let mut value = [0u8; TEXT_VALUE_LEN];
    reader.read_exact(&mut name)?;
    reader.read_exact(&mut value)?;
    Ok((trim_field(&name), trim_field(&value)))
}

/// Write one name/value text record, truncating over-long values
pub fn write_text_record<W: Write>(writer: &mut W, name: &str, value: &str) -> NativeResult<()> {
    writer.write_all(&pad_text(name, TEXT_NAME_LEN))?;
    writer.write_all(&pad_text(value, TEXT_VALUE_LEN))?;
    Ok(())
}

fn pad_text(text: &str, len: usize) -> Vec<u8> {
    let mut field: Vec<u8> = text.bytes().take(len).collect();
    field.resize(len, b' ');
    field
}

/// Decode an expanded CDS time: days since 1958 (u16), ms of day (u32),
/// microseconds (u16), nanoseconds (u16)
pub fn read_cds_expanded<R: Read>(reader: &mut R) -> NativeResult<DateTime<Utc>> {
    let days = reader.read_u16::<BigEndian>()?;
    let millis = reader.read_u32::<BigEndian>()?;
    let micros = reader.read_u16::<BigEndian>()?;
    let nanos = reader.read_u16::<BigEndian>()?;

    Ok(cds_epoch()?
        + Duration::days(i64::from(days))
        + Duration::milliseconds(i64::from(millis))
        + Duration::microseconds(i64::from(micros))
        + Duration::nanoseconds(i64::from(nanos)))
}

pub fn write_cds_expanded<W: Write>(writer: &mut W, time: &DateTime<Utc>) -> NativeResult<()> {
    let since_epoch = *time - cds_epoch()?;
    let days = since_epoch.num_days();
    let rem = since_epoch - Duration::days(days);
    let millis = rem.num_milliseconds();
    let rem = rem - Duration::milliseconds(millis);
    let micros = rem.num_microseconds().unwrap_or(0);
    let nanos = (rem - Duration::microseconds(micros))
        .num_nanoseconds()
        .unwrap_or(0);

    if !(0..=i64::from(u16::MAX)).contains(&days) {
        return Err(NativeError::InvalidFormat(format!(
            "Time {} cannot be expressed as a CDS day count",
            time
        )));
    }

    writer.write_u16::<BigEndian>(days as u16)?;
    writer.write_u32::<BigEndian>(millis as u32)?;
    writer.write_u16::<BigEndian>(micros as u16)?;
    writer.write_u16::<BigEndian>(nanos as u16)?;
    Ok(())
}

/// Move a reader to the start of the next fixed-size section
pub fn seek_section(cursor: &mut Cursor<&[u8]>, section_start: usize) {
    cursor.set_position(section_start as u64);
}

/// Zero-fill a buffer up to the end of a fixed-size section
pub fn pad_section(buf: &mut Vec<u8>, section_end: usize) -> NativeResult<()> {
    if buf.len() > section_end {
        return Err(NativeError::Processing(format!(
            "Section overflow: {} bytes written, section ends at {}",
            buf.len(),
            section_end
        )));
    }
    buf.resize(section_end, 0);
    Ok(())
}

/// Fail with a format error unless `bytes` holds at least `len` bytes
pub fn require_len(bytes: &[u8], len: usize, what: &str) -> NativeResult<()> {
    if bytes.len() < len {
        return Err(NativeError::InvalidFormat(format!(
            "Truncated {}: expected {} bytes, got {}",
            what,
            len,
            bytes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_text_record_trimming() {
        let mut buf = Vec::new();
        write_text_record(&mut buf, "NumberLinesVISIR", "3712").unwrap();
        assert_eq!(buf.len(), TEXT_RECORD_LEN);

        let (name, value) = read_text_record(&mut Cursor::new(&buf[..])).unwrap();
        assert_eq!(name, "NumberLinesVISIR");
        assert_eq!(value, "3712");
    }

    #[test]
    fn test_text_record_nul_padding() {
        let mut raw = vec![0u8; TEXT_RECORD_LEN];
        raw[..4].copy_from_slice(b"SMOD");
        raw[TEXT_NAME_LEN..TEXT_NAME_LEN + 3].copy_from_slice(b"NOM");
        let (name, value) = read_text_record(&mut Cursor::new(&raw[..])).unwrap();
        assert_eq!(name, "SMOD");
        assert_eq!(value, "NOM");
    }

    #[test]
    fn test_cds_epoch_is_zero_days() {
        let raw = [0u8; CDS_EXPANDED_LEN];
        let time = read_cds_expanded(&mut Cursor::new(&raw[..])).unwrap();
        assert_eq!(time, Utc.with_ymd_and_hms(1958, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_cds_known_time() {
        // 2019-01-01 is day 22280 after the CDS epoch
        let time = Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 9).unwrap()
            + Duration::microseconds(1_500);
        let mut buf = Vec::new();
        write_cds_expanded(&mut buf, &time).unwrap();
        assert_eq!(&buf[..2], &22280u16.to_be_bytes());
        assert_eq!(&buf[2..6], &43_209_001u32.to_be_bytes());
        assert_eq!(&buf[6..8], &500u16.to_be_bytes());

        let decoded = read_cds_expanded(&mut Cursor::new(&buf[..])).unwrap();
        assert_eq!(decoded, time);
    }

    #[test]
    fn test_require_len() {
        assert!(require_len(&[0u8; 4], 4, "record").is_ok());
        assert!(matches!(
            require_len(&[0u8; 3], 4, "record"),
            Err(NativeError::InvalidFormat(_))
        ));
    }
}
