// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct CmdOptions {
    /// The filename of the SPI flash image to inspect
    #[arg()]
    pub input: String,

    /// Physical address the first byte of the image is mapped at.
    ///
    /// Defaults to the address that places the last byte of the image at
    /// 0xFFFFFFFF, which is how the flash is decoded below 4GiB.
    #[arg(short, long, value_parser = parse_address)]
    pub base: Option<u64>,

    /// Print verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the entries of the PSP directory.
    List,

    /// Write the contents of a PSP directory entry to a file.
    Extract {
        /// Entry type, decimal or 0x-prefixed hex
        #[arg(short = 't', long = "type", value_parser = parse_entry_type)]
        entry_type: u32,

        /// Output filename
        #[arg(short, long)]
        output: String,
    },

    /// Check the PSP directory checksum. Exits with an error on mismatch.
    Verify,
}

fn parse_number(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

fn parse_address(s: &str) -> Result<u64, String> {
    parse_number(s)
}

fn parse_entry_type(s: &str) -> Result<u32, String> {
    let n = parse_number(s)?;
    u32::try_from(n).map_err(|_| format!("entry type '{s}' out of range"))
}
