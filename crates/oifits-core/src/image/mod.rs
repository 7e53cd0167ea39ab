//! In-memory model of FITS images: planes, the HDUs owning them, and files.
//!
//! Angles are stored in radians and wavelengths in meters whatever the units
//! of the file they came from; conversion happens once, in [`loader`].

pub mod loader;
pub mod writer;

use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::header::Header;

pub use loader::{load, repair_degenerate_axes, LoadOptions};
pub use writer::{write, WriteOptions};

/// Reference pixel used when CRPIXn is absent.
pub const DEFAULT_CRPIX: f64 = 1.0;
/// Reference value used when CRVALn is absent.
pub const DEFAULT_CRVAL: f64 = 0.0;
/// Increment used when CDELTn is absent.
pub const DEFAULT_CDELT: f64 = 1.0;

/// One 2-D pixel plane.
#[derive(Debug, Clone, PartialEq)]
pub struct FitsImage {
    /// `file#hdu` for a single image, `file#hdu-k/n` for plane k of a cube.
    pub identifier: String,
    /// 1-based plane index within the owning HDU.
    pub image_index: usize,

    pub pix_ref_col: f64,
    pub pix_ref_row: f64,
    pub pix_ref_wl: f64,

    /// Reference values: radians on the spatial axes, meters on the spectral.
    pub val_ref_col: f64,
    pub val_ref_row: f64,
    pub val_ref_wl: f64,

    /// Signed increments, same units as the reference values.
    pub inc_col: f64,
    pub inc_row: f64,
    pub inc_wl: f64,

    pub data_min: f64,
    pub data_max: f64,

    /// Row-major pixels, `(rows, cols)` = `(NAXIS2, NAXIS1)`.
    data: Array2<f32>,
}

impl FitsImage {
    /// A plane with default geometry and its data range computed.
    pub fn new(data: Array2<f32>) -> Self {
        let mut image = FitsImage {
            identifier: String::new(),
            image_index: 1,
            pix_ref_col: DEFAULT_CRPIX,
            pix_ref_row: DEFAULT_CRPIX,
            pix_ref_wl: DEFAULT_CRPIX,
            val_ref_col: DEFAULT_CRVAL,
            val_ref_row: DEFAULT_CRVAL,
            val_ref_wl: f64::NAN,
            inc_col: DEFAULT_CDELT,
            inc_row: DEFAULT_CDELT,
            inc_wl: f64::NAN,
            data_min: f64::NAN,
            data_max: f64::NAN,
            data,
        };
        image.update_data_range();
        image
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Replace the pixels and recompute the data range.
    pub fn set_data(&mut self, data: Array2<f32>) {
        self.data = data;
        self.update_data_range();
    }

    /// Min and max over the finite pixels; NaN when there are none.
    pub fn update_data_range(&mut self) {
        let (min, max) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min > max {
            self.data_min = f64::NAN;
            self.data_max = f64::NAN;
        } else {
            self.data_min = min as f64;
            self.data_max = max as f64;
        }
    }

    pub fn has_wavelength(&self) -> bool {
        !self.val_ref_wl.is_nan()
    }

    /// Angle (rad) at the center of column `col` (0-based).
    pub fn col_coord(&self, col: usize) -> f64 {
        self.val_ref_col + (col as f64 + 1.0 - self.pix_ref_col) * self.inc_col
    }

    /// Angle (rad) at the center of row `row` (0-based).
    pub fn row_coord(&self, row: usize) -> f64 {
        self.val_ref_row + (row as f64 + 1.0 - self.pix_ref_row) * self.inc_row
    }

    /// Wavelength (m) of this plane, NaN if the image has no spectral axis.
    pub fn wavelength(&self) -> f64 {
        self.val_ref_wl + (self.image_index as f64 - self.pix_ref_wl) * self.inc_wl
    }

    /// Smallest absolute spatial increment (rad).
    pub fn min_angle(&self) -> f64 {
        self.inc_col.abs().min(self.inc_row.abs())
    }

    /// Angular extent `(width, height)` in radians.
    pub fn field_of_view(&self) -> (f64, f64) {
        (
            self.cols() as f64 * self.inc_col.abs(),
            self.rows() as f64 * self.inc_row.abs(),
        )
    }
}

/// One image HDU: a single plane or the planes of a cube.
#[derive(Debug, Clone, Default)]
pub struct FitsImageHdu {
    /// Position of the HDU in its file, the primary being 0.
    pub hdu_index: usize,
    /// HDUNAME, if any.
    pub name: Option<String>,
    /// Header cards as read, without END.
    pub header: Header,
    pub images: Vec<FitsImage>,
    /// Checksum of the data unit (see [`crate::checksum::checksum`]).
    pub checksum: u32,
}

impl FitsImageHdu {
    pub fn new(hdu_index: usize) -> Self {
        FitsImageHdu {
            hdu_index,
            ..Default::default()
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn is_cube(&self) -> bool {
        self.images.len() > 1
    }
}

/// A FITS file reduced to its image HDUs.
#[derive(Debug, Clone, Default)]
pub struct FitsImageFile {
    pub path: Option<PathBuf>,
    pub hdus: Vec<FitsImageHdu>,
}

impl FitsImageFile {
    pub fn new(path: Option<&Path>) -> Self {
        FitsImageFile {
            path: path.map(Path::to_path_buf),
            hdus: Vec::new(),
        }
    }

    /// File name without directories, empty for an in-memory file.
    pub fn file_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn image_hdu_count(&self) -> usize {
        self.hdus.len()
    }

    pub fn images(&self) -> impl Iterator<Item = &FitsImage> {
        self.hdus.iter().flat_map(|h| h.images.iter())
    }
}
