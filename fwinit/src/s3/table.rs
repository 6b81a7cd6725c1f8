// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

//! Flat in-memory representation of a [`BootScript`], suitable for placing
//! in a HOB or a reserved memory region that survives suspend.

extern crate alloc;

use super::{BootScript, BootScriptEntry, S3Error};
use crate::error::FwError;
use crate::pci::{ConfigWidth, PciAddress};
use alloc::vec::Vec;
use core::mem::size_of;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const BOOT_SCRIPT_SIGNATURE: [u8; 4] = *b"S3PC";
pub const BOOT_SCRIPT_VERSION: u16 = 1;

const OPCODE_PCI_CONFIG_WRITE: u8 = 1;
const ENTRY_SIZE: u16 = 16;

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
struct TableHeader {
    signature: [u8; 4],
    version: u16,
    entry_size: u16,
    count: u32,
    reserved: u32,
}

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
struct RawEntry {
    opcode: u8,
    width: u8,
    reserved: u16,
    address: u32,
    value: u32,
    reserved2: u32,
}

impl From<&BootScriptEntry> for RawEntry {
    fn from(entry: &BootScriptEntry) -> Self {
        match *entry {
            BootScriptEntry::PciConfigWrite {
                address,
                width,
                value,
            } => Self {
                opcode: OPCODE_PCI_CONFIG_WRITE,
                width: width.bytes() as u8,
                reserved: 0,
                address: address.sbdfo(),
                value,
                reserved2: 0,
            },
        }
    }
}

impl TryFrom<&RawEntry> for BootScriptEntry {
    type Error = S3Error;

    fn try_from(raw: &RawEntry) -> Result<Self, Self::Error> {
        if raw.opcode != OPCODE_PCI_CONFIG_WRITE {
            return Err(S3Error::InvalidOpcode(raw.opcode));
        }
        let width = match raw.width {
            1 => ConfigWidth::Byte,
            2 => ConfigWidth::Word,
            4 => ConfigWidth::Dword,
            w => return Err(S3Error::InvalidWidth(w)),
        };
        Ok(Self::PciConfigWrite {
            address: PciAddress::from_sbdfo(raw.address),
            width,
            value: raw.value,
        })
    }
}

impl BootScript {
    /// Serializes the script. Addresses are stored in the segment/bus/
    /// device/function/offset layout, so every segment survives a restore.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FwError> {
        let entries = self.entries();
        let count = u32::try_from(entries.len())
            .map_err(|_| S3Error::TooManyEntries(entries.len()))?;
        let header = TableHeader {
            signature: BOOT_SCRIPT_SIGNATURE,
            version: BOOT_SCRIPT_VERSION,
            entry_size: ENTRY_SIZE,
            count,
            reserved: 0,
        };

        let mut out =
            Vec::with_capacity(size_of::<TableHeader>() + entries.len() * size_of::<RawEntry>());
        out.extend_from_slice(header.as_bytes());
        for entry in entries.iter() {
            out.extend_from_slice(RawEntry::from(entry).as_bytes());
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FwError> {
        let (header, rest) =
            TableHeader::read_from_prefix(bytes).map_err(|_| S3Error::Truncated)?;
        if header.signature != BOOT_SCRIPT_SIGNATURE {
            return Err(S3Error::InvalidSignature.into());
        }
        if header.version != BOOT_SCRIPT_VERSION {
            return Err(S3Error::UnsupportedVersion(header.version).into());
        }
        if header.entry_size != ENTRY_SIZE {
            return Err(S3Error::InvalidEntrySize(header.entry_size).into());
        }

        let count = usize::try_from(header.count).map_err(|_| S3Error::Truncated)?;
        let len = count
            .checked_mul(size_of::<RawEntry>())
            .ok_or(S3Error::Truncated)?;
        let body = rest.get(..len).ok_or(S3Error::Truncated)?;

        let entries = body
            .chunks_exact(size_of::<RawEntry>())
            .map(|chunk| {
                let raw = RawEntry::read_from_bytes(chunk).map_err(|_| S3Error::Truncated)?;
                BootScriptEntry::try_from(&raw)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_entries(entries))
    }
}
