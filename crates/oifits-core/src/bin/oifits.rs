//! Inspect and convert FITS image files.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use oifits_core::image::{load, write, FitsImageFile};
use oifits_core::{BitDepth, LoadOptions, WriteOptions};

#[derive(Parser, Debug)]
#[command(name = "oifits")]
#[command(about = "Inspect and convert FITS images and cubes")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize the image HDUs of a file
    Info {
        file: PathBuf,
        /// Check DATASUM keywords against the data
        #[arg(long)]
        verify: bool,
    },
    /// Rewrite the images of a file, optionally at another bit depth
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Output BITPIX (8, 16, 32, 64, -32 or -64)
        #[arg(long, default_value_t = -32, allow_hyphen_values = true)]
        bitpix: i64,
        /// Keep only the first HDU holding images
        #[arg(long)]
        first_only: bool,
    },
}

fn describe(file: &FitsImageFile) -> String {
    let mut out = format!("{}: {} image HDU(s)\n", file.file_name(), file.image_hdu_count());
    for hdu in &file.hdus {
        let name = hdu.name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default();
        out.push_str(&format!(
            "HDU {}{}: {} image(s), datasum {}\n",
            hdu.hdu_index,
            name,
            hdu.image_count(),
            hdu.checksum
        ));
        for image in &hdu.images {
            out.push_str(&format!(
                "  {}: {} x {}, range [{}, {}]",
                image.identifier,
                image.cols(),
                image.rows(),
                image.data_min,
                image.data_max
            ));
            if image.has_wavelength() {
                out.push_str(&format!(", wavelength {:e} m", image.wavelength()));
            }
            out.push('\n');
        }
    }
    out
}

fn run(args: Args) -> oifits_core::Result<()> {
    match args.command {
        Command::Info { file, verify } => {
            let options = LoadOptions {
                verify_datasum: verify,
                ..Default::default()
            };
            let loaded = load(&file, &options)?;
            print!("{}", describe(&loaded));
        }
        Command::Convert {
            input,
            output,
            bitpix,
            first_only,
        } => {
            let options = LoadOptions {
                first_only,
                ..Default::default()
            };
            let mut loaded = load(&input, &options)?;
            let bitpix = BitDepth::from_bitpix(bitpix)?;
            write(&output, &mut loaded, &WriteOptions { bitpix })?;
            println!(
                "{} -> {} ({} HDU(s), BITPIX {})",
                input.display(),
                output.display(),
                loaded.image_hdu_count(),
                bitpix.bitpix()
            );
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
