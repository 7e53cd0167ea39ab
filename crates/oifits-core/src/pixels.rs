//! Bit-depth polymorphic pixel storage.
//!
//! On disk pixels are big-endian values of one of six BITPIX kinds. They are
//! decoded into a [`PixelArray`] and normalized to `f32` planes with
//! BSCALE/BZERO applied; the writer goes the other way.

use std::ops::Range;

use bytemuck::{cast_slice, pod_collect_to_vec, Pod};

use crate::error::{Error, Result};
use crate::header::Header;

/// The six BITPIX storage kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// BITPIX = 8, unsigned bytes.
    U8,
    /// BITPIX = 16.
    I16,
    /// BITPIX = 32.
    I32,
    /// BITPIX = 64.
    I64,
    /// BITPIX = -32.
    #[default]
    F32,
    /// BITPIX = -64.
    F64,
}

impl BitDepth {
    pub fn from_bitpix(bitpix: i64) -> Result<Self> {
        match bitpix {
            8 => Ok(BitDepth::U8),
            16 => Ok(BitDepth::I16),
            32 => Ok(BitDepth::I32),
            64 => Ok(BitDepth::I64),
            -32 => Ok(BitDepth::F32),
            -64 => Ok(BitDepth::F64),
            other => Err(Error::InvalidBitpix(other)),
        }
    }

    pub fn bitpix(self) -> i64 {
        match self {
            BitDepth::U8 => 8,
            BitDepth::I16 => 16,
            BitDepth::I32 => 32,
            BitDepth::I64 => 64,
            BitDepth::F32 => -32,
            BitDepth::F64 => -64,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        (self.bitpix().unsigned_abs() / 8) as usize
    }

    pub fn is_float(self) -> bool {
        self.bitpix() < 0
    }

    /// Inclusive range of raw values for integer kinds.
    fn raw_range(self) -> Option<(f64, f64)> {
        match self {
            BitDepth::U8 => Some((0.0, u8::MAX as f64)),
            BitDepth::I16 => Some((i16::MIN as f64, i16::MAX as f64)),
            BitDepth::I32 => Some((i32::MIN as f64, i32::MAX as f64)),
            BitDepth::I64 => Some((i64::MIN as f64, i64::MAX as f64)),
            BitDepth::F32 | BitDepth::F64 => None,
        }
    }
}

/// Affine BSCALE/BZERO transform, `physical = raw * bscale + bzero`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub bscale: f64,
    pub bzero: f64,
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling {
            bscale: 1.0,
            bzero: 0.0,
        }
    }
}

impl Scaling {
    pub fn from_header(header: &Header) -> Self {
        Scaling {
            bscale: header.get_f64("BSCALE").unwrap_or(1.0),
            bzero: header.get_f64("BZERO").unwrap_or(0.0),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.bscale == 1.0 && self.bzero == 0.0
    }

    #[inline]
    fn apply(&self, raw: f64) -> f32 {
        (raw * self.bscale + self.bzero) as f32
    }
}

/// Decoded pixels, typed by bit depth.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

fn decode_be<T: Pod>(raw: &[u8], from_be: fn(T) -> T) -> Vec<T> {
    let mut values: Vec<T> = pod_collect_to_vec(raw);
    for v in &mut values {
        *v = from_be(*v);
    }
    values
}

fn encode_be<T: Pod>(values: &[T], to_be: fn(T) -> T) -> Vec<u8> {
    let swapped: Vec<T> = values.iter().map(|&v| to_be(v)).collect();
    cast_slice(&swapped).to_vec()
}

/// Widen integer pixels, mapping the BLANK value to NaN.
fn widen<T: Copy + PartialEq>(
    values: &[T],
    blank: Option<T>,
    to_f64: impl Fn(T) -> f64,
    scaling: Scaling,
) -> Vec<f32> {
    values
        .iter()
        .map(|&v| {
            if Some(v) == blank {
                f32::NAN
            } else {
                scaling.apply(to_f64(v))
            }
        })
        .collect()
}

impl PixelArray {
    /// Decode `raw` big-endian bytes. A trailing partial pixel is ignored.
    pub fn decode(depth: BitDepth, raw: &[u8]) -> Self {
        let raw = &raw[..raw.len() - raw.len() % depth.bytes_per_pixel()];
        match depth {
            BitDepth::U8 => PixelArray::U8(raw.to_vec()),
            BitDepth::I16 => PixelArray::I16(decode_be(raw, i16::from_be)),
            BitDepth::I32 => PixelArray::I32(decode_be(raw, i32::from_be)),
            BitDepth::I64 => PixelArray::I64(decode_be(raw, i64::from_be)),
            BitDepth::F32 => PixelArray::F32(decode_be(raw, |v: f32| {
                f32::from_bits(u32::from_be(v.to_bits()))
            })),
            BitDepth::F64 => PixelArray::F64(decode_be(raw, |v: f64| {
                f64::from_bits(u64::from_be(v.to_bits()))
            })),
        }
    }

    /// Big-endian bytes, without block padding.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            PixelArray::U8(v) => v.clone(),
            PixelArray::I16(v) => encode_be(v, i16::to_be),
            PixelArray::I32(v) => encode_be(v, i32::to_be),
            PixelArray::I64(v) => encode_be(v, i64::to_be),
            PixelArray::F32(v) => encode_be(v, |x: f32| f32::from_bits(x.to_bits().to_be())),
            PixelArray::F64(v) => encode_be(v, |x: f64| f64::from_bits(x.to_bits().to_be())),
        }
    }

    pub fn depth(&self) -> BitDepth {
        match self {
            PixelArray::U8(_) => BitDepth::U8,
            PixelArray::I16(_) => BitDepth::I16,
            PixelArray::I32(_) => BitDepth::I32,
            PixelArray::I64(_) => BitDepth::I64,
            PixelArray::F32(_) => BitDepth::F32,
            PixelArray::F64(_) => BitDepth::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelArray::U8(v) => v.len(),
            PixelArray::I16(v) => v.len(),
            PixelArray::I32(v) => v.len(),
            PixelArray::I64(v) => v.len(),
            PixelArray::F32(v) => v.len(),
            PixelArray::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the pixels in `range`, e.g. one plane of a cube.
    pub fn slice(&self, range: Range<usize>) -> Result<PixelArray> {
        if range.end > self.len() || range.start > range.end {
            return Err(Error::UnexpectedEof);
        }
        Ok(match self {
            PixelArray::U8(v) => PixelArray::U8(v[range].to_vec()),
            PixelArray::I16(v) => PixelArray::I16(v[range].to_vec()),
            PixelArray::I32(v) => PixelArray::I32(v[range].to_vec()),
            PixelArray::I64(v) => PixelArray::I64(v[range].to_vec()),
            PixelArray::F32(v) => PixelArray::F32(v[range].to_vec()),
            PixelArray::F64(v) => PixelArray::F64(v[range].to_vec()),
        })
    }

    /// Physical values as `f32`.
    ///
    /// Bytes are unsigned. Integer pixels equal to `blank` become NaN.
    /// Single precision data with identity scaling is returned without a copy.
    pub fn into_f32(self, scaling: Scaling, blank: Option<i64>) -> Vec<f32> {
        let blank_as = |lo: i64, hi: i64| blank.filter(|b| (lo..=hi).contains(b));
        match self {
            PixelArray::U8(v) => widen(
                &v,
                blank_as(0, u8::MAX as i64).map(|b| b as u8),
                |p| (p & 0xFF) as f64,
                scaling,
            ),
            PixelArray::I16(v) => widen(
                &v,
                blank_as(i16::MIN as i64, i16::MAX as i64).map(|b| b as i16),
                f64::from,
                scaling,
            ),
            PixelArray::I32(v) => widen(
                &v,
                blank_as(i32::MIN as i64, i32::MAX as i64).map(|b| b as i32),
                f64::from,
                scaling,
            ),
            PixelArray::I64(v) => widen(&v, blank, |p| p as f64, scaling),
            PixelArray::F32(v) if scaling.is_identity() => v,
            PixelArray::F32(v) => v.iter().map(|&p| scaling.apply(p as f64)).collect(),
            PixelArray::F64(v) => v.iter().map(|&p| scaling.apply(p)).collect(),
        }
    }

    /// Store physical values at `depth`.
    ///
    /// Float kinds are stored as is. Integer kinds are quantized linearly over
    /// the finite data range; NaN pixels are written as the returned BLANK
    /// value, which is reserved at the bottom of the raw range.
    pub fn quantize(values: &[f32], depth: BitDepth) -> (PixelArray, Scaling, Option<i64>) {
        let Some((raw_min, raw_max)) = depth.raw_range() else {
            let pixels = match depth {
                BitDepth::F64 => PixelArray::F64(values.iter().map(|&v| v as f64).collect()),
                _ => PixelArray::F32(values.to_vec()),
            };
            return (pixels, Scaling::default(), None);
        };

        let has_nan = values.iter().any(|v| v.is_nan());
        let lo_raw = if has_nan { raw_min + 1.0 } else { raw_min };
        let (min, max) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v as f64), hi.max(v as f64))
            });
        let (min, max) = if min > max { (0.0, 0.0) } else { (min, max) };

        let bscale = if max > min {
            (max - min) / (raw_max - lo_raw)
        } else {
            1.0
        };
        let scaling = Scaling {
            bscale,
            bzero: min - lo_raw * bscale,
        };
        let blank = has_nan.then_some(raw_min as i64);

        let raw = values.iter().map(|&v| {
            if v.is_nan() {
                raw_min
            } else {
                libm::round((v as f64 - scaling.bzero) / bscale).clamp(lo_raw, raw_max)
            }
        });
        let pixels = match depth {
            BitDepth::U8 => PixelArray::U8(raw.map(|r| r as u8).collect()),
            BitDepth::I16 => PixelArray::I16(raw.map(|r| r as i16).collect()),
            BitDepth::I32 => PixelArray::I32(raw.map(|r| r as i32).collect()),
            _ => PixelArray::I64(raw.map(|r| r as i64).collect()),
        };
        (pixels, scaling, blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bitpix_mapping() {
        for bitpix in [8, 16, 32, 64, -32, -64] {
            assert_eq!(BitDepth::from_bitpix(bitpix).unwrap().bitpix(), bitpix);
        }
        assert!(matches!(BitDepth::from_bitpix(24), Err(Error::InvalidBitpix(24))));
        assert_eq!(BitDepth::I64.bytes_per_pixel(), 8);
        assert_eq!(BitDepth::U8.bytes_per_pixel(), 1);
        assert!(BitDepth::F64.is_float());
        assert_eq!(BitDepth::default(), BitDepth::F32);
    }

    #[test]
    fn decode_big_endian() {
        let raw = [0x01, 0x02, 0xFF, 0xFE];
        assert_eq!(
            PixelArray::decode(BitDepth::I16, &raw),
            PixelArray::I16(vec![0x0102, -2])
        );
        let raw = 1.5f32.to_be_bytes();
        assert_eq!(PixelArray::decode(BitDepth::F32, &raw), PixelArray::F32(vec![1.5]));
    }

    #[test]
    fn encode_inverts_decode() {
        let pixels = PixelArray::I32(vec![i32::MIN, -1, 0, 7, i32::MAX]);
        let bytes = pixels.encode();
        assert_eq!(&bytes[..4], &[0x80, 0, 0, 0]);
        assert_eq!(PixelArray::decode(BitDepth::I32, &bytes), pixels);
    }

    #[test]
    fn unsigned_bytes() {
        let pixels = PixelArray::decode(BitDepth::U8, &[0xFF, 0x00, 0x80]);
        assert_eq!(pixels.into_f32(Scaling::default(), None), vec![255.0, 0.0, 128.0]);
    }

    #[test]
    fn scaling_applies_after_widening() {
        let scaling = Scaling {
            bscale: 2.0,
            bzero: 100.0,
        };
        let out = PixelArray::I16(vec![-3, 0, 5]).into_f32(scaling, None);
        assert_eq!(out, vec![94.0, 100.0, 110.0]);
        let out = PixelArray::F64(vec![0.25]).into_f32(scaling, None);
        assert_relative_eq!(out[0], 100.5);
    }

    #[test]
    fn blank_becomes_nan() {
        let out = PixelArray::I16(vec![-32768, 1]).into_f32(Scaling::default(), Some(-32768));
        assert!(out[0].is_nan());
        assert_eq!(out[1], 1.0);
        // Out-of-range BLANK never matches.
        let out = PixelArray::U8(vec![255]).into_f32(Scaling::default(), Some(-1));
        assert_eq!(out, vec![255.0]);
    }

    #[test]
    fn slice_extracts_plane() {
        let cube = PixelArray::I16((0..12).collect());
        assert_eq!(cube.slice(4..8).unwrap(), PixelArray::I16(vec![4, 5, 6, 7]));
        assert!(cube.slice(8..16).is_err());
    }

    #[test]
    fn quantize_float_kinds_is_lossless() {
        let values = [1.5f32, -2.0, f32::NAN];
        let (pixels, scaling, blank) = PixelArray::quantize(&values, BitDepth::F64);
        assert!(scaling.is_identity());
        assert!(blank.is_none());
        assert_eq!(pixels.depth(), BitDepth::F64);
    }

    #[test]
    fn quantize_integer_round_trips_within_step() {
        let values: Vec<f32> = (0..50).map(|i| i as f32 * 0.37 - 4.0).collect();
        for depth in [BitDepth::U8, BitDepth::I16, BitDepth::I32] {
            let (pixels, scaling, blank) = PixelArray::quantize(&values, depth);
            assert!(blank.is_none());
            let back = pixels.into_f32(scaling, None);
            for (a, b) in values.iter().zip(&back) {
                assert!((a - b).abs() <= scaling.bscale as f32, "{depth:?}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn quantize_reserves_blank_for_nan() {
        let values = [0.0f32, f32::NAN, 10.0];
        let (pixels, scaling, blank) = PixelArray::quantize(&values, BitDepth::I16);
        assert_eq!(blank, Some(i16::MIN as i64));
        let back = pixels.into_f32(scaling, blank);
        assert!(back[1].is_nan());
        assert_relative_eq!(back[0], 0.0, epsilon = 1e-3);
        assert_relative_eq!(back[2], 10.0, epsilon = 1e-3);
    }

    #[test]
    fn quantize_constant_image() {
        let (pixels, scaling, _) = PixelArray::quantize(&[3.0, 3.0], BitDepth::U8);
        assert_eq!(pixels.into_f32(scaling, None), vec![3.0, 3.0]);
    }
}
