//! Sequential access to the HDUs of a FITS byte stream.
//!
//! [`FitsReader`] owns the whole (decompressed) file in memory. The file
//! handle itself is only held inside [`FitsReader::open`], so it is closed on
//! every exit path before any parsing starts.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::block::{block_starts_with, padded_byte_len, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::header::Header;

/// Largest NAXIS value allowed by the standard.
pub const MAX_NAXIS: i64 = 999;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub struct FitsReader {
    bytes: Vec<u8>,
    pos: usize,
}

impl FitsReader {
    /// Read `path` into memory, inflating gzip-compressed files.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let bytes = if bytes.starts_with(&GZIP_MAGIC) {
            let inflated = gunzip(&bytes)?;
            debug!("inflated gzip stream to {} bytes", inflated.len());
            inflated
        } else {
            bytes
        };
        Ok(FitsReader { bytes, pos: 0 })
    }

    /// Byte offset of the next unread block.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.bytes.len() {
            return Err(Error::UnexpectedEof);
        }
        self.pos = offset;
        Ok(())
    }

    /// True when no complete block remains.
    pub fn is_at_eof(&self) -> bool {
        self.bytes.len().saturating_sub(self.pos) < BLOCK_SIZE
    }

    /// Parse the header at the current position. Returns `Ok(None)` at the end
    /// of the stream.
    pub fn next_header(&mut self) -> Result<Option<Header>> {
        if self.is_at_eof() {
            return Ok(None);
        }
        let (header, consumed) = Header::parse(&self.bytes[self.pos..])?;
        self.pos += consumed;
        Ok(Some(header))
    }

    /// Return the data unit described by `header` (without block padding) and
    /// advance past it.
    ///
    /// Data shorter than declared yields `Ok(None)` and moves the reader to the
    /// end of the stream.
    pub fn read_data(&mut self, header: &Header) -> Result<Option<&[u8]>> {
        let len = data_byte_len(header)?;
        let start = self.pos;
        let Some(end) = start.checked_add(len).filter(|&e| e <= self.bytes.len()) else {
            warn!(
                "data unit at offset {start} truncated: {len} bytes declared, {} available",
                self.bytes.len() - start
            );
            self.pos = self.bytes.len();
            return Ok(None);
        };
        self.pos = (start + padded_byte_len(len)).min(self.bytes.len());
        Ok(Some(&self.bytes[start..end]))
    }

    /// Skip the data unit described by `header` without returning it.
    pub fn skip_data(&mut self, header: &Header) -> Result<()> {
        let len = padded_byte_len(data_byte_len(header)?);
        self.pos = self.pos.saturating_add(len).min(self.bytes.len());
        Ok(())
    }

    /// Scan forward, starting with the block after the current one, to the
    /// next `XTENSION` header. Returns false, leaving the reader at EOF, if
    /// there is none.
    pub fn skip_to_next_extension(&mut self) -> bool {
        let mut offset = (self.pos / BLOCK_SIZE + 1) * BLOCK_SIZE;
        while offset + BLOCK_SIZE <= self.bytes.len() {
            if block_starts_with(&self.bytes[offset..], b"XTENSION") {
                self.pos = offset;
                return true;
            }
            offset += BLOCK_SIZE;
        }
        self.pos = self.bytes.len();
        false
    }
}

/// Size in bytes of the data unit described by `header`, before padding.
///
/// `|BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`, where a random
/// groups primary (`NAXIS1 = 0`) leaves the first axis out of the product.
pub fn data_byte_len(header: &Header) -> Result<usize> {
    let bitpix = header.require_i64("BITPIX")?;
    if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
        return Err(Error::InvalidBitpix(bitpix));
    }
    let naxis = header.require_i64("NAXIS")?;
    if !(0..=MAX_NAXIS).contains(&naxis) {
        return Err(Error::InvalidNaxis(naxis));
    }
    if naxis == 0 {
        return Ok(0);
    }

    let overflow = || Error::InvalidHeader("data size overflows".into());
    let mut axes = Vec::with_capacity(naxis as usize);
    for i in 1..=naxis {
        let len = header.require_i64(&format!("NAXIS{i}"))?;
        let len = usize::try_from(len)
            .map_err(|_| Error::InvalidHeader(format!("NAXIS{i} = {len} is negative")))?;
        axes.push(len);
    }
    let random_groups = axes[0] == 0 && naxis > 1;
    let counted = if random_groups { &axes[1..] } else { &axes[..] };
    let product = counted
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(overflow)?;
    if product == 0 && !random_groups {
        return Ok(0);
    }

    let pcount = header.get_i64("PCOUNT").unwrap_or(0).max(0) as usize;
    let gcount = header.get_i64("GCOUNT").unwrap_or(1).max(0) as usize;
    let bytes_per_value = (bitpix.unsigned_abs() / 8) as usize;
    pcount
        .checked_add(product)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_value))
        .ok_or_else(overflow)
}

// ---------------------------------------------------------------------------
// gzip
// ---------------------------------------------------------------------------

/// Strip the gzip member header and trailer, returning the deflate payload.
fn gzip_payload(data: &[u8]) -> Result<&[u8]> {
    let bad = |what: &str| Error::Decompress(format!("gzip {what}"));
    if data.len() < 18 || data[2] != 0x08 {
        return Err(bad("header"));
    }
    let flags = data[3];
    let mut pos = 10usize;
    if flags & 0x04 != 0 {
        let xlen = data
            .get(pos..pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
            .ok_or_else(|| bad("extra field"))?;
        pos += 2 + xlen;
    }
    for flag in [0x08u8, 0x10] {
        if flags & flag != 0 {
            let nul = data
                .get(pos..)
                .and_then(|rest| rest.iter().position(|&b| b == 0))
                .ok_or_else(|| bad("name or comment"))?;
            pos += nul + 1;
        }
    }
    if flags & 0x02 != 0 {
        pos += 2;
    }
    if pos + 8 > data.len() {
        return Err(bad("trailer"));
    }
    Ok(&data[pos..data.len() - 8])
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let payload = gzip_payload(data)?;
    miniz_oxide::inflate::decompress_to_vec(payload)
        .map_err(|e| Error::Decompress(format!("inflate failed: {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{pad_to_block, DATA_PAD_BYTE};
    use crate::value::Value;

    fn header(cards: &[(&str, i64)]) -> Header {
        let mut h = Header::new();
        h.set("SIMPLE", Value::Logical(true), None);
        for (k, v) in cards {
            h.set(k, Value::Integer(*v), None);
        }
        h
    }

    fn hdu_bytes(h: &Header, data_len: usize) -> Vec<u8> {
        let mut bytes = h.to_bytes();
        let mut data = vec![7u8; data_len];
        pad_to_block(&mut data, DATA_PAD_BYTE);
        bytes.extend_from_slice(&data);
        bytes
    }

    fn gzip(raw: &[u8]) -> Vec<u8> {
        let mut out = vec![0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff];
        out.extend_from_slice(&miniz_oxide::deflate::compress_to_vec(raw, 6));
        out.extend_from_slice(&[0u8; 8]);
        out
    }

    #[test]
    fn data_len_of_image() {
        let h = header(&[("BITPIX", -32), ("NAXIS", 2), ("NAXIS1", 10), ("NAXIS2", 3)]);
        assert_eq!(data_byte_len(&h).unwrap(), 120);
    }

    #[test]
    fn data_len_with_pcount_gcount() {
        let h = header(&[
            ("BITPIX", 8),
            ("NAXIS", 2),
            ("NAXIS1", 16),
            ("NAXIS2", 4),
            ("PCOUNT", 36),
            ("GCOUNT", 1),
        ]);
        assert_eq!(data_byte_len(&h).unwrap(), 100);
    }

    #[test]
    fn data_len_random_groups() {
        let h = header(&[
            ("BITPIX", 16),
            ("NAXIS", 3),
            ("NAXIS1", 0),
            ("NAXIS2", 3),
            ("NAXIS3", 2),
            ("PCOUNT", 4),
            ("GCOUNT", 5),
        ]);
        assert_eq!(data_byte_len(&h).unwrap(), 2 * 5 * (4 + 6));
    }

    #[test]
    fn data_len_rejects_bad_naxis_and_bitpix() {
        let h = header(&[("BITPIX", 8), ("NAXIS", -1)]);
        assert!(matches!(data_byte_len(&h), Err(Error::InvalidNaxis(-1))));
        let h = header(&[("BITPIX", 8), ("NAXIS", 1000)]);
        assert!(matches!(data_byte_len(&h), Err(Error::InvalidNaxis(1000))));
        let h = header(&[("BITPIX", 12), ("NAXIS", 0)]);
        assert!(matches!(data_byte_len(&h), Err(Error::InvalidBitpix(12))));
        let h = header(&[("BITPIX", 8), ("NAXIS", 2), ("NAXIS1", 4)]);
        assert!(matches!(data_byte_len(&h), Err(Error::MissingKeyword(_))));
    }

    #[test]
    fn reads_header_then_data() {
        let h = header(&[("BITPIX", 8), ("NAXIS", 1), ("NAXIS1", 10)]);
        let mut reader = FitsReader::from_bytes(hdu_bytes(&h, 10)).unwrap();
        let parsed = reader.next_header().unwrap().unwrap();
        assert_eq!(parsed.get_i64("NAXIS1"), Some(10));
        assert_eq!(reader.position(), BLOCK_SIZE);
        let data = reader.read_data(&parsed).unwrap().unwrap();
        assert_eq!(data, &[7u8; 10]);
        assert!(reader.is_at_eof());
        assert!(reader.next_header().unwrap().is_none());
    }

    #[test]
    fn truncated_data_is_end_of_stream() {
        let h = header(&[("BITPIX", 8), ("NAXIS", 1), ("NAXIS1", 5000)]);
        let mut bytes = hdu_bytes(&h, 5000);
        bytes.truncate(BLOCK_SIZE + 100);
        let mut reader = FitsReader::from_bytes(bytes).unwrap();
        let parsed = reader.next_header().unwrap().unwrap();
        assert!(reader.read_data(&parsed).unwrap().is_none());
        assert!(reader.is_at_eof());
    }

    #[test]
    fn seek_back_to_start() {
        let h = header(&[("BITPIX", 8), ("NAXIS", 0)]);
        let mut reader = FitsReader::from_bytes(h.to_bytes()).unwrap();
        reader.next_header().unwrap();
        reader.seek(0).unwrap();
        assert_eq!(reader.position(), 0);
        assert!(reader.seek(reader.len() + 1).is_err());
    }

    #[test]
    fn skip_finds_next_extension() {
        let h = header(&[("BITPIX", 8), ("NAXIS", 0)]);
        let mut bytes = h.to_bytes();
        bytes.extend_from_slice(&[b'?'; BLOCK_SIZE]);
        let mut ext = Header::new();
        ext.set("XTENSION", Value::String("IMAGE".into()), None);
        bytes.extend_from_slice(&ext.to_bytes());

        let mut reader = FitsReader::from_bytes(bytes).unwrap();
        reader.next_header().unwrap();
        assert!(reader.next_header().is_err());
        assert!(reader.skip_to_next_extension());
        assert_eq!(reader.position(), 2 * BLOCK_SIZE);
        assert!(!reader.skip_to_next_extension());
        assert!(reader.is_at_eof());
    }

    #[test]
    fn gzip_input_is_inflated() {
        let h = header(&[("BITPIX", 8), ("NAXIS", 1), ("NAXIS1", 3)]);
        let raw = hdu_bytes(&h, 3);
        let mut reader = FitsReader::from_bytes(gzip(&raw)).unwrap();
        assert_eq!(reader.len(), raw.len());
        let parsed = reader.next_header().unwrap().unwrap();
        assert_eq!(parsed.get_i64("NAXIS1"), Some(3));
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let bytes = vec![0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert!(matches!(
            FitsReader::from_bytes(bytes),
            Err(Error::Decompress(_))
        ));
    }

    #[test]
    fn missing_file() {
        let err = FitsReader::open("/nonexistent/dir/file.fits").err().unwrap();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
