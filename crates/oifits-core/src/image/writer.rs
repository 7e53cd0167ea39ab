//! Serialize a [`FitsImageFile`] back to FITS.

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::{FitsImage, FitsImageFile, FitsImageHdu};
use crate::block::{pad_to_block, DATA_PAD_BYTE};
use crate::checksum::stamp_checksums;
use crate::error::{Error, Result};
use crate::header::{Card, Header};
use crate::pixels::{BitDepth, PixelArray};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Storage depth of the pixels. Integer depths are quantized with
    /// BSCALE/BZERO over the data range of each HDU.
    pub bitpix: BitDepth,
}

/// Keywords regenerated from the model, never replayed from stored cards.
const SKIP_KEYWORDS: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "EXTEND", "PCOUNT",
    "GCOUNT", "BSCALE", "BZERO", "BLANK", "CRPIX1", "CRPIX2", "CRPIX3", "CRVAL1", "CRVAL2",
    "CRVAL3", "CDELT1", "CDELT2", "CDELT3", "CUNIT1", "CUNIT2", "CUNIT3", "DATAMIN", "DATAMAX",
    "CHECKSUM", "DATASUM", "HDUNAME", "END",
];

/// Write `file` to `path`. The first HDU holding images becomes the primary
/// HDU, the others IMAGE extensions. Each HDU's `checksum` is updated.
pub fn write(path: impl AsRef<Path>, file: &mut FitsImageFile, options: &WriteOptions) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_bytes(file, options)?;
    fs::write(path, &bytes)?;
    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Serialize `file` in memory.
pub fn to_bytes(file: &mut FitsImageFile, options: &WriteOptions) -> Result<Vec<u8>> {
    let count = file.hdus.iter().filter(|h| h.image_count() > 0).count();
    if count == 0 {
        return Err(Error::NoImageData(format!(
            "no image in '{}'",
            file.file_name()
        )));
    }

    let mut out = Vec::new();
    for (i, hdu) in file
        .hdus
        .iter_mut()
        .filter(|h| h.image_count() > 0)
        .enumerate()
    {
        let primary = i == 0;
        let (header, data) = encode_hdu(hdu, primary, primary && count > 1, options.bitpix)?;
        debug!(
            "HDU#{i}: {} card(s), {} data byte(s)",
            header.len(),
            data.len()
        );
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&data);
    }
    Ok(out)
}

fn encode_hdu(
    hdu: &mut FitsImageHdu,
    primary: bool,
    extend: bool,
    depth: BitDepth,
) -> Result<(Header, Vec<u8>)> {
    let first = &hdu.images[0];
    let (rows, cols) = (first.rows(), first.cols());
    if hdu.images.iter().any(|im| im.rows() != rows || im.cols() != cols) {
        return Err(Error::InvalidHeader(format!(
            "planes of HDU#{} differ in shape",
            hdu.hdu_index
        )));
    }
    let cube = hdu.is_cube();

    let values: Vec<f32> = hdu
        .images
        .iter()
        .flat_map(|im| im.data().iter().copied())
        .collect();
    let (pixels, scaling, blank) = PixelArray::quantize(&values, depth);

    let mut header = Header::new();
    let int = |n: usize| Value::Integer(n as i64);
    if primary {
        header.add(Card::new("SIMPLE", Value::Logical(true), Some("conforms to FITS standard")));
    } else {
        header.add(Card::new("XTENSION", Value::String("IMAGE".into()), Some("image extension")));
    }
    header.add(Card::new("BITPIX", Value::Integer(depth.bitpix()), Some("bits per data value")));
    header.add(Card::new("NAXIS", Value::Integer(if cube { 3 } else { 2 }), Some("number of data axes")));
    header.add(Card::new("NAXIS1", int(cols), Some("length of data axis 1")));
    header.add(Card::new("NAXIS2", int(rows), Some("length of data axis 2")));
    if cube {
        header.add(Card::new("NAXIS3", int(hdu.image_count()), Some("length of data axis 3")));
    }
    if extend {
        header.add(Card::new("EXTEND", Value::Logical(true), Some("FITS dataset may contain extensions")));
    }
    if !primary {
        header.add(Card::new("PCOUNT", Value::Integer(0), Some("number of parameters")));
        header.add(Card::new("GCOUNT", Value::Integer(1), Some("number of groups")));
    }
    if !scaling.is_identity() {
        header.add(Card::new("BSCALE", Value::Float(scaling.bscale), Some("physical = raw * BSCALE + BZERO")));
        header.add(Card::new("BZERO", Value::Float(scaling.bzero), None));
    }
    if let Some(blank) = blank {
        header.add(Card::new("BLANK", Value::Integer(blank), Some("raw value of undefined pixels")));
    }
    if let Some(name) = &hdu.name {
        header.add(Card::new("HDUNAME", Value::String(name.clone()), None));
    }
    geometry_cards(&mut header, first);
    data_range_cards(&mut header, &hdu.images);

    for card in hdu.header.cards() {
        if !SKIP_KEYWORDS.contains(&card.keyword.as_str()) {
            header.add(card.clone());
        }
    }

    let mut data = pixels.encode();
    pad_to_block(&mut data, DATA_PAD_BYTE);
    hdu.checksum = stamp_checksums(&mut header, &data);
    Ok((header, data))
}

/// Values are canonical (radians, meters), so no CUNITn is written.
/// Undefined (non-finite) values are left out and read back as defaults.
fn geometry_cards(header: &mut Header, image: &FitsImage) {
    let mut axis = |i: usize, pix: f64, val: f64, inc: f64| {
        let (val_comment, inc_comment) = if i < 3 {
            ("Coordinate at reference pixel (rad)", "Coord. incr. per pixel (rad)")
        } else {
            ("Coordinate at reference pixel (m)", "Coord. incr. per pixel (m)")
        };
        let cards = [
            ("CRPIX", pix, "Reference pixel"),
            ("CRVAL", val, val_comment),
            ("CDELT", inc, inc_comment),
        ];
        for (prefix, value, comment) in cards {
            if value.is_finite() {
                header.add(Card::new(&format!("{prefix}{i}"), Value::Float(value), Some(comment)));
            }
        }
    };
    axis(1, image.pix_ref_col, image.val_ref_col, image.inc_col);
    axis(2, image.pix_ref_row, image.val_ref_row, image.inc_row);
    if image.has_wavelength() {
        axis(3, image.pix_ref_wl, image.val_ref_wl, image.inc_wl);
    }
}

fn data_range_cards(header: &mut Header, images: &[FitsImage]) {
    let min = images.iter().map(|im| im.data_min).filter(|v| !v.is_nan()).reduce(f64::min);
    let max = images.iter().map(|im| im.data_max).filter(|v| !v.is_nan()).reduce(f64::max);
    if let Some(min) = min {
        header.add(Card::new("DATAMIN", Value::Float(min), Some("Minimum data value")));
    }
    if let Some(max) = max {
        header.add(Card::new("DATAMAX", Value::Float(max), Some("Maximum data value")));
    }
}
