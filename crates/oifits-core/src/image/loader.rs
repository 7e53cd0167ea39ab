//! Read image HDUs from a FITS file into a [`FitsImageFile`].

use std::path::Path;

use log::{debug, info, warn};
use ndarray::Array2;

use super::{FitsImage, FitsImageFile, FitsImageHdu, DEFAULT_CDELT, DEFAULT_CRPIX, DEFAULT_CRVAL};
use crate::checksum::{checksum, verify_datasum};
use crate::error::{Error, Result};
use crate::header::{Card, Header};
use crate::pixels::{BitDepth, PixelArray, Scaling};
use crate::stream::{FitsReader, MAX_NAXIS};
use crate::units::Unit;
use crate::value::Value;

/// Reference wavelengths above this many meters are taken to be microns
/// written without CUNIT3.
pub const MICRON_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Stop after the first HDU holding at least one image.
    pub first_only: bool,
    /// Reject HDUs whose DATASUM does not match their data.
    pub verify_datasum: bool,
}

/// Load the image HDUs of `path`.
///
/// Errors on the primary HDU abort the load. Errors on a later HDU drop that
/// HDU only; loading resumes at the next extension.
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<FitsImageFile> {
    let path = path.as_ref();
    let mut reader = FitsReader::open(path)?;
    let mut file = FitsImageFile::new(Some(path));
    read_hdus(&mut reader, &mut file, options)?;
    info!(
        "loaded {} image HDU(s) from {}",
        file.image_hdu_count(),
        path.display()
    );
    Ok(file)
}

/// Load image HDUs from an in-memory (possibly gzipped) FITS stream.
pub fn load_bytes(bytes: Vec<u8>, options: &LoadOptions) -> Result<FitsImageFile> {
    let mut reader = FitsReader::from_bytes(bytes)?;
    let mut file = FitsImageFile::default();
    read_hdus(&mut reader, &mut file, options)?;
    Ok(file)
}

enum Outcome {
    End,
    Skipped,
    Image(FitsImageHdu),
}

fn read_hdus(reader: &mut FitsReader, file: &mut FitsImageFile, options: &LoadOptions) -> Result<()> {
    let name = file.file_name();
    let mut index = 0;
    loop {
        let start = reader.position();
        match read_hdu(reader, index, &name, options) {
            Ok(Outcome::End) if index == 0 => {
                return Err(Error::InvalidHeader("no primary header".into()));
            }
            Ok(Outcome::End) => break,
            Ok(Outcome::Skipped) => {}
            Ok(Outcome::Image(hdu)) => {
                file.hdus.push(hdu);
                if options.first_only {
                    debug!("first image HDU loaded; skipping the others");
                    break;
                }
            }
            Err(e) if index == 0 => return Err(e),
            Err(e) => {
                warn!("skipped HDU#{index} [{name}]: {e}");
                if reader.seek(start).is_err() || !reader.skip_to_next_extension() {
                    break;
                }
            }
        }
        index += 1;
    }
    Ok(())
}

fn read_hdu(
    reader: &mut FitsReader,
    index: usize,
    file_name: &str,
    options: &LoadOptions,
) -> Result<Outcome> {
    let Some(mut header) = reader.next_header()? else {
        return Ok(Outcome::End);
    };
    let naxis = header.require_i64("NAXIS")?;
    if !(0..=MAX_NAXIS).contains(&naxis) {
        return Err(Error::InvalidNaxis(naxis));
    }
    if let Some(xtension) = header.get_string("XTENSION") {
        if xtension.trim() != "IMAGE" {
            info!("skipped {} HDU#{index} [{file_name}]", xtension.trim());
            reader.skip_data(&header)?;
            return Ok(Outcome::Skipped);
        }
    }

    // Data size comes from the header as written, before any repair.
    let Some(raw) = reader.read_data(&header)? else {
        return Ok(Outcome::End);
    };
    if options.verify_datasum && verify_datasum(&header, raw) == Some(false) {
        return Err(Error::InvalidHeader(format!(
            "DATASUM mismatch in HDU#{index}"
        )));
    }
    let data_checksum = checksum(raw);

    repair_degenerate_axes(&mut header)?;
    let naxis = header.require_i64("NAXIS")?;
    if !(2..=3).contains(&naxis) {
        info!("skipped HDU#{index} [{file_name}] - unsupported NAXIS = {naxis}");
        return Ok(Outcome::Skipped);
    }

    let cols = axis_len(&header, 1)?;
    let rows = axis_len(&header, 2)?;
    let planes = if naxis == 3 { axis_len(&header, 3)? } else { 1 };
    debug!("HDU#{index} [{file_name}]: {cols} x {rows} x {planes}");

    let depth = BitDepth::from_bitpix(header.require_i64("BITPIX")?)?;
    let pixels = PixelArray::decode(depth, raw);
    let scaling = Scaling::from_header(&header);
    let blank = header.get_i64("BLANK");
    let geometry = Geometry::from_header(&header)?;
    // Advisory only: the range is recomputed from the pixels.
    let stored_min = header.get_f64("DATAMIN").unwrap_or(f64::NAN);
    let stored_max = header.get_f64("DATAMAX").unwrap_or(f64::NAN);

    let mut hdu = FitsImageHdu::new(index);
    hdu.name = header.get_string("HDUNAME").map(|s| s.trim().to_string());
    hdu.checksum = data_checksum;

    let plane_len = rows * cols;
    for k in 1..=planes {
        if plane_len == 0 {
            info!("skipped HDU#{index} [{file_name}][{k}/{planes}] - incorrect size = {cols} x {rows}");
            continue;
        }
        let plane = pixels.slice((k - 1) * plane_len..k * plane_len)?;
        let data = Array2::from_shape_vec((rows, cols), plane.into_f32(scaling, blank))
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        let mut image = FitsImage::new(data);
        geometry.apply(&mut image);
        if (!stored_min.is_nan() && stored_min != image.data_min)
            || (!stored_max.is_nan() && stored_max != image.data_max)
        {
            debug!(
                "HDU#{index} [{k}/{planes}]: stored range [{stored_min}, {stored_max}] replaced by [{}, {}]",
                image.data_min, image.data_max
            );
        }
        if naxis == 3 {
            image.image_index = k;
            image.identifier = format!("{file_name}#{index}-{k}/{planes}");
        } else {
            image.identifier = format!("{file_name}#{index}");
        }
        hdu.images.push(image);
    }

    hdu.header = header;
    if hdu.image_count() == 0 {
        return Ok(Outcome::Skipped);
    }
    Ok(Outcome::Image(hdu))
}

fn axis_len(header: &Header, axis: usize) -> Result<usize> {
    let keyword = format!("NAXIS{axis}");
    let n = header.require_i64(&keyword)?;
    usize::try_from(n).map_err(|_| Error::InvalidHeader(format!("{keyword} = {n} is negative")))
}

/// Drop every axis of length 0 or 1 and renumber the remaining NAXISn cards.
///
/// WCS keywords (CRPIXn, CRVALn, ...) keep their numbering. Returns whether
/// the header changed; a repaired header is left unchanged by a second call.
pub fn repair_degenerate_axes(header: &mut Header) -> Result<bool> {
    let naxis = header.get_i64("NAXIS").unwrap_or(0);
    if !(0..=MAX_NAXIS).contains(&naxis) {
        return Err(Error::InvalidNaxis(naxis));
    }
    let names: Vec<String> = (1..=naxis).map(|i| format!("NAXIS{i}")).collect();
    let axes: Vec<i64> = names
        .iter()
        .map(|n| header.get_i64(n).unwrap_or(0))
        .collect();
    let kept: Vec<i64> = axes.iter().copied().filter(|&n| n > 1).collect();
    if kept.len() == axes.len() {
        return Ok(false);
    }
    debug!("degenerate axes {axes:?} reduced to {kept:?}");

    let mut cards = Vec::with_capacity(header.len());
    for card in header.cards() {
        if names.contains(&card.keyword) {
            continue;
        }
        if card.keyword == "NAXIS" {
            cards.push(Card::new(
                "NAXIS",
                Value::Integer(kept.len() as i64),
                card.comment.as_deref(),
            ));
            for (i, &n) in kept.iter().enumerate() {
                cards.push(Card::new(
                    &format!("NAXIS{}", i + 1),
                    Value::Integer(n),
                    Some("length of data axis"),
                ));
            }
            continue;
        }
        cards.push(card.clone());
    }
    *header = Header::from_cards(cards);
    Ok(true)
}

/// Axis geometry of an HDU, normalized to radians and meters.
struct Geometry {
    pix_ref: [f64; 3],
    val_ref: [f64; 3],
    inc: [f64; 3],
}

impl Geometry {
    fn from_header(header: &Header) -> Result<Self> {
        let unit = |i: usize| Unit::parse_opt(header.get_string(&format!("CUNIT{i}")));
        let units = [unit(1)?, unit(2)?, unit(3)?];
        let real = |k: &str, i: usize, default: f64| header.get_f64(&format!("{k}{i}")).unwrap_or(default);

        let mut g = Geometry {
            pix_ref: [0.0; 3],
            val_ref: [0.0; 3],
            inc: [0.0; 3],
        };
        for (i, axis_unit) in units.into_iter().enumerate() {
            let (canonical, crval, cdelt) = if i < 2 {
                (Unit::Radian, DEFAULT_CRVAL, DEFAULT_CDELT)
            } else {
                (Unit::Meter, f64::NAN, f64::NAN)
            };
            g.pix_ref[i] = real("CRPIX", i + 1, DEFAULT_CRPIX);
            g.val_ref[i] = axis_unit.to_canonical(real("CRVAL", i + 1, crval), canonical)?;
            g.inc[i] = axis_unit.to_canonical(real("CDELT", i + 1, cdelt), canonical)?;
        }

        if g.val_ref[2] > MICRON_THRESHOLD {
            g.val_ref[2] *= 1e-6;
            g.inc[2] *= 1e-6;
            warn!(
                "fixed missing wavelength unit (microns instead of meter): CRVAL3={} - CDELT3={}",
                g.val_ref[2], g.inc[2]
            );
        }
        Ok(g)
    }

    fn apply(&self, image: &mut FitsImage) {
        [image.pix_ref_col, image.pix_ref_row, image.pix_ref_wl] = self.pix_ref;
        [image.val_ref_col, image.val_ref_row, image.val_ref_wl] = self.val_ref;
        [image.inc_col, image.inc_row, image.inc_wl] = self.inc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn header(cards: &[(&str, Value)]) -> Header {
        Header::from_cards(
            cards
                .iter()
                .map(|(k, v)| Card::new(k, v.clone(), None))
                .collect(),
        )
    }

    #[test]
    fn repair_drops_unit_axes_and_renumbers() {
        let mut h = header(&[
            ("SIMPLE", Value::Logical(true)),
            ("BITPIX", Value::Integer(-32)),
            ("NAXIS", Value::Integer(4)),
            ("NAXIS1", Value::Integer(1)),
            ("NAXIS2", Value::Integer(64)),
            ("NAXIS3", Value::Integer(32)),
            ("NAXIS4", Value::Integer(1)),
            ("CRVAL3", Value::Float(1.5)),
        ]);
        assert!(repair_degenerate_axes(&mut h).unwrap());
        assert_eq!(h.get_i64("NAXIS"), Some(2));
        assert_eq!(h.get_i64("NAXIS1"), Some(64));
        assert_eq!(h.get_i64("NAXIS2"), Some(32));
        assert!(!h.contains("NAXIS3"));
        assert!(!h.contains("NAXIS4"));
        assert_eq!(h.get_f64("CRVAL3"), Some(1.5));
        let keys: Vec<_> = h.cards().iter().map(|c| c.keyword.as_str()).collect();
        assert_eq!(keys, ["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "CRVAL3"]);

        let once = h.clone();
        assert!(!repair_degenerate_axes(&mut h).unwrap());
        assert_eq!(h, once);
    }

    #[test]
    fn repair_rejects_bad_naxis() {
        let mut h = header(&[("NAXIS", Value::Integer(1000))]);
        assert!(matches!(repair_degenerate_axes(&mut h), Err(Error::InvalidNaxis(1000))));
        let mut h = header(&[("NAXIS", Value::Integer(-1))]);
        assert!(matches!(repair_degenerate_axes(&mut h), Err(Error::InvalidNaxis(-1))));
    }

    #[test]
    fn geometry_defaults() {
        let g = Geometry::from_header(&Header::new()).unwrap();
        assert_eq!(g.pix_ref, [1.0; 3]);
        assert_eq!(&g.val_ref[..2], &[0.0, 0.0]);
        assert_eq!(&g.inc[..2], &[1.0, 1.0]);
        assert!(g.val_ref[2].is_nan());
        assert!(g.inc[2].is_nan());
    }

    #[test]
    fn geometry_converts_units() {
        let h = header(&[
            ("CUNIT1", Value::String("deg".into())),
            ("CDELT1", Value::Float(-1.0)),
            ("CUNIT2", Value::String("  ARCSEC".into())),
            ("CDELT2", Value::Float(3600.0)),
            ("CUNIT3", Value::String("MICRON".into())),
            ("CRVAL3", Value::Float(2.2)),
            ("CDELT3", Value::Float(0.1)),
        ]);
        let g = Geometry::from_header(&h).unwrap();
        assert_relative_eq!(g.inc[0], -std::f64::consts::PI / 180.0);
        assert_relative_eq!(g.inc[1], std::f64::consts::PI / 180.0);
        assert_relative_eq!(g.val_ref[2], 2.2e-6);
        assert_relative_eq!(g.inc[2], 0.1e-6);
    }

    #[test]
    fn wavelength_in_microns_without_unit() {
        let h = header(&[("CRVAL3", Value::Float(1.6)), ("CDELT3", Value::Float(0.01))]);
        let g = Geometry::from_header(&h).unwrap();
        assert_relative_eq!(g.val_ref[2], 1.6e-6);
        assert_relative_eq!(g.inc[2], 1e-8);

        let h = header(&[("CRVAL3", Value::Float(0.05))]);
        assert_relative_eq!(Geometry::from_header(&h).unwrap().val_ref[2], 0.05);
    }

    #[test]
    fn bad_unit_is_an_error() {
        let h = header(&[("CUNIT1", Value::String("furlong".into()))]);
        assert!(matches!(Geometry::from_header(&h), Err(Error::UnsupportedUnit(_))));
    }
}
