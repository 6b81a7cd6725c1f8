// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

//! S3 resume boot script.
//!
//! On S3 resume the memory controller and the root complex come back
//! unconfigured while DRAM content survives. Configuration writes performed
//! during the normal boot path are recorded in a [`BootScript`], stored in
//! memory that survives suspend and replayed in order on the resume path.

extern crate alloc;

pub mod recorder;
pub mod table;

pub use recorder::S3PciConfig;

use crate::error::FwError;
use crate::locking::SpinLock;
use core::fmt;
use crate::pci::{ConfigWidth, PciAddress, PciConfigSpace};
use alloc::vec::Vec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum S3Error {
    /// Serialized table does not start with the expected signature
    InvalidSignature,
    /// Serialized table has an unsupported version
    UnsupportedVersion(u16),
    /// Serialized table is shorter than its header claims
    Truncated,
    /// Unknown entry opcode
    InvalidOpcode(u8),
    /// Unknown entry width
    InvalidWidth(u8),
    /// Serialized table declares an entry size other than 16 bytes
    InvalidEntrySize(u16),
    /// Script has more entries than the table format can count
    TooManyEntries(usize),
}

impl From<S3Error> for FwError {
    fn from(err: S3Error) -> Self {
        Self::S3(err)
    }
}

impl fmt::Display for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "bad table signature"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported table version {v}"),
            Self::Truncated => write!(f, "table truncated"),
            Self::InvalidOpcode(op) => write!(f, "unknown opcode {op:#04x}"),
            Self::InvalidWidth(w) => write!(f, "unknown entry width {w}"),
            Self::InvalidEntrySize(size) => write!(f, "unexpected entry size {size}"),
            Self::TooManyEntries(n) => write!(f, "{n} entries do not fit the table"),
        }
    }
}

/// A single recorded operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootScriptEntry {
    PciConfigWrite {
        address: PciAddress,
        width: ConfigWidth,
        value: u32,
    },
}

impl BootScriptEntry {
    fn execute(&self, cfg: &dyn PciConfigSpace) -> Result<(), FwError> {
        match *self {
            Self::PciConfigWrite {
                address,
                width,
                value,
            } => match width {
                ConfigWidth::Byte => cfg.write8(address, value as u8),
                ConfigWidth::Word => cfg.write16(address, value as u16),
                ConfigWidth::Dword => cfg.write32(address, value),
            },
        }
    }
}

/// Ordered list of operations to replay on S3 resume.
///
/// Entries are appended through `&self` so a script can be shared by every
/// [`S3PciConfig`] handed out during boot.
#[derive(Debug, Default)]
pub struct BootScript {
    entries: SpinLock<Vec<BootScriptEntry>>,
}

impl BootScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<BootScriptEntry>) -> Self {
        Self {
            entries: SpinLock::new(entries),
        }
    }

    pub fn save_pci_write(&self, address: PciAddress, width: ConfigWidth, value: u32) {
        log::trace!("S3 save {address} {width:?} = {value:#x}");
        self.entries.lock().push(BootScriptEntry::PciConfigWrite {
            address,
            width,
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<BootScriptEntry> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Re-issues every entry in recording order. Stops at the first failing
    /// entry. Returns the number of entries executed.
    pub fn replay(&self, cfg: &dyn PciConfigSpace) -> Result<usize, FwError> {
        let entries = self.entries();
        for (i, entry) in entries.iter().enumerate() {
            entry.execute(cfg).inspect_err(|e| {
                log::error!("S3 boot script entry {i} failed: {e}");
            })?;
        }
        log::info!("Replayed {} S3 boot script entries", entries.len());
        Ok(entries.len())
    }
}
