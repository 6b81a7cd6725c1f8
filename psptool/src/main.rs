// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, Write};

use clap::Parser;
use cmd_options::{CmdOptions, Commands};
use flash::FlashImage;
use fwinit::config::ROM_SIGNATURE_ADDRESSES;
use fwinit::error::FwError;
use fwinit::psp::directory::find_psp_dir_base;
use fwinit::psp::{PspDirectory, PspEntryType, PspError};

mod cmd_options;
mod flash;
mod logger;

fn main() -> Result<(), Box<dyn Error>> {
    let options = CmdOptions::parse();
    logger::install_console_logger(options.verbose)?;

    let data = fs::read(&options.input).map_err(|e| {
        eprintln!("Failed to open flash image {}", options.input);
        e
    })?;
    let flash = FlashImage::new(data, options.base)?;
    log::debug!(
        "Mapped {:#x} bytes of {} at {:#x}",
        flash.size(),
        options.input,
        flash.base()
    );

    let dir = read_directory(&flash).map_err(|e| {
        eprintln!("No PSP directory found in {}", options.input);
        e
    })?;

    match options.command {
        Commands::List => list_command(&mut io::stdout().lock(), &dir)?,
        Commands::Extract { entry_type, output } => {
            extract_command(&flash, &dir, PspEntryType(entry_type), &output)?
        }
        Commands::Verify => verify_command(&dir)?,
    }

    Ok(())
}

fn read_directory(flash: &FlashImage) -> Result<PspDirectory, Box<dyn Error>> {
    let base = find_psp_dir_base(flash, &ROM_SIGNATURE_ADDRESSES)?;
    Ok(PspDirectory::read(flash, base)?)
}

fn list_command(out: &mut impl Write, dir: &PspDirectory) -> Result<(), Box<dyn Error>> {
    let status = if dir.verify_checksum() { "ok" } else { "MISMATCH" };
    writeln!(
        out,
        "PSP directory at {:#010x}, {} entries, checksum {:#010x} ({status})",
        dir.base(),
        dir.entries().len(),
        dir.checksum()
    )?;
    writeln!(out, "{:<6} {:<28} {:>10} {:>18}", "type", "name", "size", "location")?;
    for entry in dir.entries() {
        let kind = entry.kind();
        let (size, location) = (entry.size, entry.location);
        writeln!(
            out,
            "{:<#6x} {:<28} {:>#10x} {:>#18x}",
            kind.0,
            kind.name(),
            size,
            location
        )?;
    }
    Ok(())
}

fn extract_command(
    flash: &FlashImage,
    dir: &PspDirectory,
    entry_type: PspEntryType,
    output: &str,
) -> Result<(), Box<dyn Error>> {
    let entry = dir
        .find(entry_type)
        .ok_or(FwError::from(PspError::EntryNotFound(entry_type)))?;
    let bytes = flash.entry_bytes(entry.location, entry.size)?;

    let mut file = File::create(output).map_err(|e| {
        eprintln!("Failed to create output file {}", output);
        e
    })?;
    file.write_all(bytes).map_err(|e| {
        eprintln!("Failed to write output file {}", output);
        e
    })?;

    log::info!("Wrote {:#x} bytes of {entry_type} to {output}", bytes.len());
    Ok(())
}

fn verify_command(dir: &PspDirectory) -> Result<(), Box<dyn Error>> {
    let computed = dir.compute_checksum();
    if computed != dir.checksum() {
        return Err(format!(
            "PSP directory checksum mismatch: stored {:#010x}, computed {computed:#010x}",
            dir.checksum()
        )
        .into());
    }
    println!("PSP directory checksum {computed:#010x} OK");
    Ok(())
}
