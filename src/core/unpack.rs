//! 10-bit pixel unpacking.
//!
//! Samples are packed MSB-first, four samples in every five bytes:
//!
//! ```text
//! byte   |    0     |    1     |    2     |    3     |    4     |
//! bits   | 00000000 | 00111111 | 11112222 | 22222233 | 33333333 |
//! ```

use crate::types::{NativeError, NativeResult};

pub const PACKED_GROUP_BYTES: usize = 5;
pub const SAMPLES_PER_GROUP: usize = 4;

#[inline(always)]
fn unpack_group(g: &[u8], out: &mut [u16]) {
    let b0 = u16::from(g[0]);
    let b1 = u16::from(g[1]);
    let b2 = u16::from(g[2]);
    let b3 = u16::from(g[3]);
    let b4 = u16::from(g[4]);
    out[0] = (b0 << 2) | (b1 >> 6);
    out[1] = ((b1 & 0x3f) << 4) | (b2 >> 4);
    out[2] = ((b2 & 0x0f) << 6) | (b3 >> 2);
    out[3] = ((b3 & 0x03) << 8) | b4;
}

fn check_packed_len(len: usize) -> NativeResult<()> {
    if len % PACKED_GROUP_BYTES != 0 {
        return Err(NativeError::InvalidFormat(format!(
            "Packed 10-bit buffer of {} bytes is not a multiple of {}",
            len, PACKED_GROUP_BYTES
        )));
    }
    Ok(())
}

/// Unpack `packed` into a caller-provided buffer of `len * 4 / 5` samples
pub fn dec10216_into(packed: &[u8], out: &mut [u16]) -> NativeResult<()> {
    check_packed_len(packed.len())?;
    let expected = packed.len() / PACKED_GROUP_BYTES * SAMPLES_PER_GROUP;
    if out.len() != expected {
        return Err(NativeError::Processing(format!(
            "Output buffer holds {} samples, {} bytes unpack to {}",
            out.len(),
            packed.len(),
            expected
        )));
    }

    for (group, samples) in packed
        .chunks_exact(PACKED_GROUP_BYTES)
        .zip(out.chunks_exact_mut(SAMPLES_PER_GROUP))
    {
        unpack_group(group, samples);
    }
    Ok(())
}

/// Expand packed 10-bit samples into one `u16` per sample
pub fn dec10216(packed: &[u8]) -> NativeResult<Vec<u16>> {
    check_packed_len(packed.len())?;
    let mut out = vec![0u16; packed.len() / PACKED_GROUP_BYTES * SAMPLES_PER_GROUP];
    dec10216_into(packed, &mut out)?;
    Ok(out)
}

/// Pack samples into the 10-bit layout; values are masked to 10 bits
pub fn pack10216(samples: &[u16]) -> NativeResult<Vec<u8>> {
    if samples.len() % SAMPLES_PER_GROUP != 0 {
        return Err(NativeError::Processing(format!(
            "{} samples cannot be packed in groups of {}",
            samples.len(),
            SAMPLES_PER_GROUP
        )));
    }

    let mut out = Vec::with_capacity(samples.len() / SAMPLES_PER_GROUP * PACKED_GROUP_BYTES);
    for s in samples.chunks_exact(SAMPLES_PER_GROUP) {
        let group = s
            .iter()
            .fold(0u64, |acc, &v| (acc << 10) | u64::from(v & 0x3ff));
        out.extend_from_slice(&group.to_be_bytes()[3..]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pattern() {
        // 0x3ff, 0x000, 0x155, 0x2aa
        let packed = [0xff, 0xc0, 0x05, 0x56, 0xaa];
        assert_eq!(dec10216(&packed).unwrap(), vec![0x3ff, 0x000, 0x155, 0x2aa]);
    }

    #[test]
    fn test_msb_first_ordering() {
        // Only the first bit of the group set -> top bit of sample 0
        assert_eq!(dec10216(&[0x80, 0, 0, 0, 0]).unwrap(), vec![512, 0, 0, 0]);
        // Only the last bit set -> lowest bit of sample 3
        assert_eq!(dec10216(&[0, 0, 0, 0, 1]).unwrap(), vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_output_length() {
        let packed = vec![0u8; 4640];
        assert_eq!(dec10216(&packed).unwrap().len(), 3712);
        assert!(dec10216(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(matches!(
            dec10216(&[0u8; 7]),
            Err(NativeError::InvalidFormat(_))
        ));
        let mut out = vec![0u16; 3];
        assert!(dec10216_into(&[0u8; 5], &mut out).is_err());
    }

    #[test]
    fn test_pack_masks_to_ten_bits() {
        let packed = pack10216(&[0xffff, 0, 0, 0]).unwrap();
        assert_eq!(dec10216(&packed).unwrap(), vec![0x3ff, 0, 0, 0]);
        assert!(pack10216(&[1, 2, 3]).is_err());
    }
}
