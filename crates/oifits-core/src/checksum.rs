//! Ones-complement HDU checksums (the HEASARC CHECKSUM/DATASUM convention).
//!
//! The loader stores the data checksum of every image HDU it keeps and
//! checks it against an embedded DATASUM; the writer stamps both DATASUM and
//! CHECKSUM on every HDU it produces.

use crate::block::BLOCK_SIZE;
use crate::header::Header;
use crate::value::Value;

// ---------------------------------------------------------------------------
// 32-bit ones-complement sum
// ---------------------------------------------------------------------------

fn fold(mut hi: u32, mut lo: u32) -> u32 {
    loop {
        let (hc, lc) = (hi >> 16, lo >> 16);
        if hc == 0 && lc == 0 {
            return (hi << 16) | lo;
        }
        hi = (hi & 0xFFFF) + lc;
        lo = (lo & 0xFFFF) + hc;
    }
}

/// Accumulate `bytes` into `sum`. A trailing partial block is summed as if
/// padded with zeros, which is how data blocks are padded on disk.
pub fn accumulate(sum: u32, bytes: &[u8]) -> u32 {
    let mut total = sum;
    for chunk in bytes.chunks(BLOCK_SIZE) {
        let (mut hi, mut lo) = (total >> 16, total & 0xFFFF);
        let mut words = chunk.chunks(2).map(|w| {
            let b0 = w[0] as u32;
            let b1 = w.get(1).copied().unwrap_or(0) as u32;
            (b0 << 8) | b1
        });
        while let Some(w0) = words.next() {
            hi += w0;
            lo += words.next().unwrap_or(0);
        }
        total = fold(hi, lo);
    }
    total
}

/// Checksum of a byte sequence.
pub fn checksum(bytes: &[u8]) -> u32 {
    accumulate(0, bytes)
}

/// Ones-complement addition of two partial sums.
pub fn ones_complement_add(a: u32, b: u32) -> u32 {
    fold((a >> 16) + (b >> 16), (a & 0xFFFF) + (b & 0xFFFF))
}

// ---------------------------------------------------------------------------
// ASCII encoding of CHECKSUM
// ---------------------------------------------------------------------------

const ZERO: i32 = b'0' as i32;

/// Punctuation between the digit and letter ranges that may not appear in an
/// encoded checksum.
fn is_excluded(ch: i32) -> bool {
    (0x3a..=0x40).contains(&ch) || (0x5b..=0x60).contains(&ch)
}

/// Encode `sum` (or its complement) as the 16-character CHECKSUM string.
pub fn encode_checksum(sum: u32, complement: bool) -> [u8; 16] {
    let value = if complement { !sum } else { sum };
    let mut interleaved = [0u8; 16];
    for byte_idx in 0..4 {
        let byte = ((value >> (24 - 8 * byte_idx)) & 0xFF) as i32;
        let mut ch = [byte / 4 + ZERO; 4];
        ch[0] += byte % 4;
        while ch.iter().any(|&c| is_excluded(c)) {
            for pair in ch.chunks_exact_mut(2) {
                if is_excluded(pair[0]) || is_excluded(pair[1]) {
                    pair[0] += 1;
                    pair[1] -= 1;
                }
            }
        }
        for (j, &c) in ch.iter().enumerate() {
            interleaved[4 * j + byte_idx] = c as u8;
        }
    }
    let mut out = [0u8; 16];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = interleaved[(i + 15) % 16];
    }
    out
}

/// Inverse of [`encode_checksum`].
pub fn decode_checksum(ascii: &[u8; 16], complement: bool) -> u32 {
    let (mut hi, mut lo) = (0u32, 0u32);
    for quad in 0..4 {
        let at = |k: usize| (ascii[(4 * quad + k + 1) % 16] as i32 - ZERO) as u32;
        hi += (at(0) << 8) + at(1);
        lo += (at(2) << 8) + at(3);
    }
    let sum = fold(hi, lo);
    if complement {
        !sum
    } else {
        sum
    }
}

// ---------------------------------------------------------------------------
// Header keywords
// ---------------------------------------------------------------------------

/// Compare the DATASUM recorded in `header` with the checksum of `data`.
///
/// Returns `None` when the header carries no usable DATASUM.
pub fn verify_datasum(header: &Header, data: &[u8]) -> Option<bool> {
    let stored = match header.value("DATASUM")? {
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        Value::Integer(n) => u64::try_from(*n).ok()?,
        _ => return None,
    };
    Some(stored as u32 == checksum(data))
}

/// A complete HDU (header and padded data) with a valid CHECKSUM sums to
/// negative zero.
pub fn verify_hdu(hdu_bytes: &[u8]) -> bool {
    matches!(checksum(hdu_bytes), 0 | 0xFFFF_FFFF)
}

/// Set DATASUM and CHECKSUM on `header` for the given padded data. Returns
/// the data checksum.
pub fn stamp_checksums(header: &mut Header, data: &[u8]) -> u32 {
    let datasum = checksum(data);
    header.set(
        "DATASUM",
        Value::String(datasum.to_string()),
        Some("data unit checksum"),
    );
    header.set(
        "CHECKSUM",
        Value::String("0000000000000000".into()),
        Some("HDU checksum"),
    );
    let hdu_sum = ones_complement_add(checksum(&header.to_bytes()), datasum);
    let encoded = encode_checksum(hdu_sum, true);
    let text = String::from_utf8_lossy(&encoded).into_owned();
    header.set("CHECKSUM", Value::String(text), None);
    datasum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{pad_to_block, DATA_PAD_BYTE};

    // ---- Encoding ----

    #[test]
    fn encode_zero() {
        assert_eq!(&encode_checksum(0, false), b"0000000000000000");
        assert_eq!(&encode_checksum(0xFFFF_FFFF, true), b"0000000000000000");
    }

    #[test]
    fn encode_known_vector() {
        let encoded = encode_checksum(1234567890, false);
        assert_eq!(&encoded, b"dCW2fBU0dBU0dBU0");
        assert_eq!(decode_checksum(&encoded, false), 1234567890);
    }

    #[test]
    fn decode_inverts_encode() {
        for &v in &[1u32, 42, 0xDEAD_BEEF, 0xFFFF_FFFF] {
            assert_eq!(decode_checksum(&encode_checksum(v, false), false), v);
            assert_eq!(decode_checksum(&encode_checksum(v, true), true), v);
        }
    }

    #[test]
    fn encoded_chars_are_alphanumeric() {
        for &v in &[255u32, 65535, 0x7F7F_7F7F, 0xDEAD_BEEF] {
            assert!(encode_checksum(v, false).iter().all(u8::is_ascii_alphanumeric));
        }
    }

    // ---- Sums ----

    #[test]
    fn checksum_of_constant_blocks() {
        assert_eq!(checksum(&vec![0u8; BLOCK_SIZE]), 0);
        assert_eq!(checksum(&vec![0xFFu8; BLOCK_SIZE]), 0xFFFF_FFFF);
    }

    #[test]
    fn partial_block_equals_zero_padded() {
        let mut data: Vec<u8> = (0..1001u32).map(|i| (i * 7 % 251) as u8).collect();
        let unpadded = checksum(&data);
        pad_to_block(&mut data, DATA_PAD_BYTE);
        assert_eq!(unpadded, checksum(&data));
    }

    #[test]
    fn sum_plus_complement_is_negative_zero() {
        let block: Vec<u8> = (0..BLOCK_SIZE).map(|i| (i % 256) as u8).collect();
        let sum = checksum(&block);
        assert!(matches!(ones_complement_add(sum, !sum), 0 | 0xFFFF_FFFF));
    }

    // ---- Keywords ----

    #[test]
    fn stamped_hdu_verifies() {
        let mut header = Header::new();
        header.set("SIMPLE", Value::Logical(true), None);
        header.set("BITPIX", Value::Integer(8), None);
        header.set("NAXIS", Value::Integer(1), None);
        header.set("NAXIS1", Value::Integer(10), None);
        let mut data: Vec<u8> = (1..=10).collect();
        pad_to_block(&mut data, DATA_PAD_BYTE);

        let datasum = stamp_checksums(&mut header, &data);
        assert_eq!(verify_datasum(&header, &data), Some(true));
        assert_eq!(datasum, checksum(&data));

        let mut hdu = header.to_bytes();
        hdu.extend_from_slice(&data);
        assert!(verify_hdu(&hdu));

        hdu[BLOCK_SIZE * 2 - 1] ^= 0x01;
        assert!(!verify_hdu(&hdu));
    }

    #[test]
    fn datasum_mismatch_and_absence() {
        let mut header = Header::new();
        assert_eq!(verify_datasum(&header, &[1, 2, 3]), None);
        header.set("DATASUM", Value::String("12".into()), None);
        assert_eq!(verify_datasum(&header, &[1, 2, 3]), Some(false));
    }
}
