use clap::{Parser, Subcommand};
use pixmill::codec::PixelEngine;
use pixmill::format::ImageFormat;
use pixmill::ops::{
    self, CompressRequest, ConvertRequest, CropRequest, MetadataRequest, ResizeRequest,
};
use pixmill::{batch, output};
use std::io::Read;
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup — trivial, called exactly once
        Box::leak(format!("{} ({hash})", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "pixmill")]
#[command(about = "Resize, compress, convert, crop, and inspect images")]
#[command(long_about = "\
Resize, compress, convert, crop, and inspect images

Every operation reads one source file and (except metadata) writes one output
file. Output formats: jpeg, png, webp, avif, tiff. Existing output files are
overwritten.

Run many operations at once with `pixmill batch`, which takes a JSON list of
descriptors and executes them concurrently. Items fail independently: a batch
always reports one outcome per item, in input order, and a bad file never
aborts its siblings.

  [
    { \"toolName\": \"resize-image\",
      \"options\": { \"imagePath\": \"/in/a.jpg\", \"outputPath\": \"/out/a.png\",
                   \"width\": 800, \"keepAspectRatio\": true } },
    { \"toolName\": \"get-image-metadata\",
      \"options\": { \"imagePath\": \"/in/b.webp\" } }
  ]

Tags: resize-image, compress-image, convert-image-format, crop-image,
get-image-metadata.")]
#[command(version = version_string())]
struct Cli {
    /// Maximum parallel workers for batch execution (capped at core count)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize an image; output format follows the output extension
    Resize {
        image: PathBuf,
        output: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Fit within the bounds, preserving aspect ratio
        #[arg(long)]
        keep_aspect_ratio: bool,
        /// 1-100 for JPEG/WebP/AVIF; reinterpreted as level 0-9 for PNG
        #[arg(long)]
        quality: Option<u8>,
    },
    /// Re-encode an image with tighter settings, keeping its format
    Compress {
        image: PathBuf,
        output: PathBuf,
        #[arg(long)]
        quality: Option<u8>,
        /// Allow lossy re-encoding (default is lossless)
        #[arg(long)]
        lossy: bool,
    },
    /// Convert an image to another format at maximum fidelity
    Convert {
        image: PathBuf,
        output: PathBuf,
        /// Target format: jpeg, png, webp, avif, tiff
        #[arg(long)]
        format: ImageFormat,
    },
    /// Extract a rectangular region at maximum fidelity
    Crop {
        image: PathBuf,
        output: PathBuf,
        #[arg(long)]
        left: u32,
        #[arg(long)]
        top: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Print file and structural metadata as JSON
    Metadata { image: PathBuf },
    /// Run a JSON list of operations concurrently ('-' reads stdin)
    Batch {
        file: PathBuf,
        /// Emit raw outcome JSON instead of the report
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    batch::init_worker_pool(cli.threads);
    let engine = PixelEngine::new();

    match cli.command {
        Command::Resize {
            image,
            output,
            width,
            height,
            keep_aspect_ratio,
            quality,
        } => {
            let written = ops::resize_image(
                &engine,
                &ResizeRequest {
                    image_path: image,
                    output_path: output,
                    width,
                    height,
                    keep_aspect_ratio,
                    quality,
                },
            )?;
            println!("Image resized and saved to {}", written.display());
        }
        Command::Compress {
            image,
            output,
            quality,
            lossy,
        } => {
            let written = ops::compress_image(
                &engine,
                &CompressRequest {
                    image_path: image,
                    output_path: output,
                    quality,
                    lossless: if lossy { Some(false) } else { None },
                },
            )?;
            println!("Image compressed and saved to {}", written.display());
        }
        Command::Convert {
            image,
            output,
            format,
        } => {
            let written = ops::convert_format(
                &engine,
                &ConvertRequest {
                    image_path: image,
                    output_path: output,
                    format,
                },
            )?;
            println!("Image converted and saved to {}", written.display());
        }
        Command::Crop {
            image,
            output,
            left,
            top,
            width,
            height,
        } => {
            let written = ops::crop_image(
                &engine,
                &CropRequest {
                    image_path: image,
                    output_path: output,
                    left,
                    top,
                    width,
                    height,
                },
            )?;
            println!("Image cropped and saved to {}", written.display());
        }
        Command::Metadata { image } => {
            let meta = ops::image_metadata(&engine, &MetadataRequest { image_path: image })?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Command::Batch { file, json } => {
            let content = if file == Path::new("-") {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(&file)?
            };
            let items: Vec<batch::BatchItem> = serde_json::from_str(&content)?;
            let outcomes = batch::run_batch(&engine, &items);
            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                output::print_batch_report(&items, &outcomes);
            }
        }
    }

    Ok(())
}
