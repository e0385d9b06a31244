//! Stribog CLI - command-line tool for Xbox 360 XEX2 extraction.
//!
//! This is the main entry point for the stribog command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use stribog::prelude::*;

/// Stribog - Xbox 360 XEX2 executable extraction tool
#[derive(Parser)]
#[command(name = "stribog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show container metadata
    Info {
        /// Path to the XEX file
        #[arg(short, long, env = "INPUT_XEX")]
        xex: PathBuf,

        /// List every optional-header entry
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract the embedded PE image
    Extract {
        /// Path to the XEX file
        #[arg(short, long, env = "INPUT_XEX")]
        xex: PathBuf,

        /// Output path for the PE image
        #[arg(short, long)]
        output: PathBuf,

        /// Also dump embedded images next to the PE
        #[arg(short, long)]
        images: bool,
    },

    /// Signature-scan any file for embedded images
    Scan {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to dump found images into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { xex, detailed } => cmd_info(&xex, detailed)?,
        Commands::Extract {
            xex,
            output,
            images,
        } => cmd_extract(&xex, &output, images)?,
        Commands::Scan { input, output } => cmd_scan(&input, output.as_deref())?,
    }

    Ok(())
}

fn cmd_info(xex_path: &Path, detailed: bool) -> Result<()> {
    let mut file = XexFile::open(xex_path).context("Failed to open XEX container")?;

    // Extraction enriches the descriptor with resources and the title;
    // header information is still useful if it fails.
    let extraction = file.extract();

    let xex = file.descriptor();
    println!(
        "Container: {} ({} bytes)",
        xex_path.display(),
        file.data().len()
    );
    println!("Title: {}", xex.title.as_deref().unwrap_or("(unknown)"));

    if let Some(exec) = &xex.execution_id {
        println!("Title ID: {}", exec.title_id_string());
        println!(
            "Version: {} (base {:#x})",
            exec.version_string(),
            exec.base_version
        );
        println!("Media ID: {:#010x}", exec.media_id);
        println!("Disc: {}/{}", exec.disc_number, exec.disc_count);
    }

    println!("Module flags: {:?}", xex.module_flags);
    println!("Region: {}", xex.file_header.game_region.describe());
    println!("Allowed media: {:?}", xex.file_header.allowed_media);
    println!("Load address: {:#010x}", xex.file_header.load_address);
    println!("Image base: {:#010x}", xex.image_base);
    if let Some(entry) = xex.entry_point() {
        println!("Entry point: {entry:#010x}");
    }
    println!("Image size: {:#x}", xex.file_header.image_size);

    match &xex.compression {
        Some(info) => {
            let encryption = match info.encryption {
                stribog::xex::EncryptionKind::Encrypted => "encrypted",
                stribog::xex::EncryptionKind::Unencrypted => "unencrypted",
            };
            print!("Payload: {}, {}", info.compression, encryption);
            if info.window_size != 0 {
                print!(", {} KiB window", info.window_size / 1024);
            }
            println!();
        }
        None => println!("Payload: raw, unencrypted"),
    }

    if let Some(path) = &xex.bound_path {
        println!("Bound path: {path}");
    }

    if !xex.libraries.is_empty() {
        println!("\nLibraries:");
        for library in &xex.libraries {
            println!(
                "  {:<10} {}{}",
                library.name,
                library.version_string(),
                if library.approved() { "" } else { " [unapproved]" }
            );
        }
    }

    if !xex.resources.is_empty() {
        println!("\nResources:");
        for resource in &xex.resources {
            println!(
                "  {:<10} {:>12} {:>8} bytes @ {:#010x}",
                resource.name,
                resource.kind.to_string(),
                resource.size,
                resource.virtual_address
            );
        }
    }

    if detailed {
        println!("\nOptional headers:");
        for header in &xex.optional_headers {
            let name = header
                .kind
                .map(|kind| format!("{kind:?}"))
                .unwrap_or_else(|| "Unknown".to_string());
            let datum_kind = if stribog::xex::is_inline(header.id) {
                "value"
            } else {
                "offset"
            };
            println!(
                "  {:#010x} {:<20} {} {:#010x}",
                header.id, name, datum_kind, header.datum
            );
        }
    }

    report_warnings(&xex.warnings);
    match extraction {
        Ok(extraction) => report_warnings(&extraction.warnings),
        Err(error) => println!("\nExtraction not possible: {error}"),
    }

    Ok(())
}

fn cmd_extract(xex_path: &Path, output: &Path, images: bool) -> Result<()> {
    println!("Opening XEX container: {}", xex_path.display());

    let mut file = XexFile::open(xex_path).context("Failed to open XEX container")?;

    let start = Instant::now();
    let extraction = file.extract().context("Failed to extract PE image")?;
    println!(
        "Recovered {} bytes in {:?}",
        extraction.pe.len(),
        start.elapsed()
    );

    report_warnings(&file.descriptor().warnings);
    report_warnings(&extraction.warnings);

    fs::write(output, &extraction.pe)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("PE image written to {}", output.display());

    if let Some(title) = &file.descriptor().title {
        println!("Title: {title}");
    }

    if images {
        let directory = output.with_extension("images");
        dump_images(&extraction.pe, file.descriptor(), &directory)?;
    }

    Ok(())
}

fn cmd_scan(input: &Path, output: Option<&Path>) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;
    let found = scan_images(&data);

    println!("{} image(s) in {}", found.len(), input.display());
    for image in &found {
        println!(
            "  {:>8} {:>10} bytes @ {:#010x}",
            image.kind.to_string(),
            image.size,
            image.offset
        );
    }

    if let Some(directory) = output {
        fs::create_dir_all(directory)?;
        for image in &found {
            let name = format!("{:08x}.{}", image.offset, image.kind.extension());
            let bytes = &data[image.offset..image.offset + image.size];
            fs::write(directory.join(&name), bytes)?;
        }
        println!("Dumped to {}", directory.display());
    }

    Ok(())
}

/// Dump named resources and signature-scanned images from the PE.
fn dump_images(pe: &[u8], xex: &Xex, directory: &Path) -> Result<()> {
    let scanned = scan_images(pe);
    let named: Vec<_> = xex
        .resources
        .iter()
        .filter(|resource| resource.data.is_some())
        .collect();

    if scanned.is_empty() && named.is_empty() {
        println!("No embedded images found");
        return Ok(());
    }

    fs::create_dir_all(directory)?;

    let pb = ProgressBar::new((scanned.len() + named.len()) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    for resource in named {
        let data = resource.data.as_deref().unwrap_or_default();
        let name = format!("{}.{}", resource.name, resource.kind.extension());
        fs::write(directory.join(&name), data)?;
        pb.inc(1);
    }

    for image in &scanned {
        let name = format!("{:08x}.{}", image.offset, image.kind.extension());
        fs::write(
            directory.join(&name),
            &pe[image.offset..image.offset + image.size],
        )?;
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!("Images dumped to {}", directory.display());
    Ok(())
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        println!("warning: {warning}");
    }
}
