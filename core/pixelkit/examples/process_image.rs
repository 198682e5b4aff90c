//! Run every pixelkit operation on one image.
//!
//! Usage:
//!   cargo run --example process_image -- <input> [output-dir]
//!
//! Writes `subject.png`, `no_background.png` and `converted.webp`.

use pixelkit::{crop_natural, encode, ImageProcessor, OutputFormat, CROP_QUALITY};
use std::path::PathBuf;

/// Margin kept around the detected subject, in natural pixels.
const SUBJECT_PADDING: f64 = 20.0;

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(input_path) = args.next() else {
        eprintln!("usage: process_image <input> [output-dir]");
        std::process::exit(2);
    };
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    std::fs::create_dir_all(&output_dir).unwrap();

    let input = std::fs::read(&input_path).unwrap();
    let mut processor = ImageProcessor::new(&input)
        .unwrap()
        .on_progress(|percent| eprint!("\r{percent:>3}%"));
    let raster = processor.raster().clone();
    println!("{input_path}: {}x{}", raster.width(), raster.height());

    match processor.detect_subject() {
        Some(subject) => {
            let padded = subject.padded(SUBJECT_PADDING, raster.natural_size());
            println!("\nsubject at {subject:?}, cropping {padded:?}");
            if let Some(cropped) = crop_natural(&raster, padded) {
                let encoded = encode(&cropped, OutputFormat::Png, CROP_QUALITY).unwrap();
                std::fs::write(output_dir.join("subject.png"), &encoded.data).unwrap();
            }
        }
        None => println!("\nno subject found"),
    }

    let mut converted = processor.format(OutputFormat::Webp);
    let webp = converted.convert().unwrap();
    std::fs::write(output_dir.join("converted.webp"), &webp.data).unwrap();
    println!("\nconverted: {} bytes", webp.data.len());

    let cutout = converted.remove_background().unwrap();
    std::fs::write(output_dir.join("no_background.png"), &cutout.data).unwrap();
    println!("\nbackground removed: {} bytes", cutout.data.len());
}
