//! Schema-driven validation of OIFITS tables and loading/writing of FITS
//! images and cubes.

pub mod block;
pub mod checksum;
pub mod error;
pub mod header;
pub mod image;
pub mod oifits;
pub mod pixels;
pub mod schema;
pub mod stream;
pub mod types;
pub mod units;
pub mod validation;
pub mod value;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use error::{Error, Result};
pub use image::{FitsImage, FitsImageFile, FitsImageHdu, LoadOptions, WriteOptions};
pub use pixels::BitDepth;
pub use validation::{CheckMode, Checker, Severity};
