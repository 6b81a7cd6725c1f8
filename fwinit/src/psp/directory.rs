// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

extern crate alloc;

use super::PspError;
use crate::error::FwError;
use crate::mem::{read_struct, PhysMemory};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::mem::size_of;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Signature of the firmware entry table embedded in the SPI ROM.
pub const FIRMWARE_TABLE_SIGNATURE: u32 = 0x55aa_55aa;

/// `$PSP` in little-endian byte order.
pub const PSP_DIRECTORY_COOKIE: u32 = u32::from_le_bytes(*b"$PSP");

/// Upper bound on the entry count accepted from a directory header.
pub const MAX_PSP_ENTRIES: u32 = 0x100;

/// Firmware entry table, found at one of a fixed set of ROM offsets.
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct FirmwareEntryTable {
    pub signature: u32,
    pub imc_rom_base: u32,
    pub gec_rom_base: u32,
    pub xhc_rom_base: u32,
    pub psp_dir_base: u32,
}

#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct PspDirectoryHeader {
    pub cookie: u32,
    pub checksum: u32,
    pub total_entries: u32,
    pub reserved: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct PspDirectoryEntry {
    pub entry_type: u32,
    pub size: u32,
    pub location: u64,
}

impl PspDirectoryEntry {
    pub const fn new(entry_type: PspEntryType, size: u32, location: u64) -> Self {
        Self {
            entry_type: entry_type.0,
            size,
            location,
        }
    }

    pub fn kind(&self) -> PspEntryType {
        PspEntryType(self.entry_type)
    }
}

/// Type field of a PSP directory entry.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PspEntryType(pub u32);

impl PspEntryType {
    pub const AMD_PUBLIC_KEY: Self = Self(0x00);
    pub const PSP_FW_BOOT_LOADER: Self = Self(0x01);
    pub const PSP_FW_TRUSTED_OS: Self = Self(0x02);
    pub const PSP_FW_RECOVERY_BOOT_LOADER: Self = Self(0x03);
    pub const PSP_NV_DATA: Self = Self(0x04);
    pub const BIOS_PUBLIC_KEY: Self = Self(0x05);
    pub const BIOS_RTM_FIRMWARE: Self = Self(0x06);
    pub const BIOS_RTM_SIGNATURE: Self = Self(0x07);
    pub const SMU_OFFCHIP_FIRMWARE: Self = Self(0x08);
    pub const SEC_DBG_PUBLIC_KEY: Self = Self(0x09);
    pub const OEM_PSP_FW_PUBLIC_KEY: Self = Self(0x0a);
    pub const SOFT_FUSE_CHAIN_01: Self = Self(0x0b);
    pub const PSP_BOOT_TIME_TRUSTLETS: Self = Self(0x0c);
    pub const PSP_BOOT_TIME_TRUSTLETS_KEY: Self = Self(0x0d);
    pub const PSP_AGESA_RESUME_FW: Self = Self(0x10);
    pub const SMU_OFF_CHIP_FW_2: Self = Self(0x12);
    pub const PSP_S3_NV_DATA: Self = Self(0x1a);

    pub fn name(self) -> &'static str {
        match self {
            Self::AMD_PUBLIC_KEY => "AMD public key",
            Self::PSP_FW_BOOT_LOADER => "PSP boot loader",
            Self::PSP_FW_TRUSTED_OS => "PSP trusted OS",
            Self::PSP_FW_RECOVERY_BOOT_LOADER => "PSP recovery boot loader",
            Self::PSP_NV_DATA => "PSP NV data",
            Self::BIOS_PUBLIC_KEY => "BIOS public key",
            Self::BIOS_RTM_FIRMWARE => "BIOS RTM firmware",
            Self::BIOS_RTM_SIGNATURE => "BIOS RTM signature",
            Self::SMU_OFFCHIP_FIRMWARE => "SMU firmware",
            Self::SEC_DBG_PUBLIC_KEY => "secure debug public key",
            Self::OEM_PSP_FW_PUBLIC_KEY => "OEM PSP public key",
            Self::SOFT_FUSE_CHAIN_01 => "soft fuse chain",
            Self::PSP_BOOT_TIME_TRUSTLETS => "boot time trustlets",
            Self::PSP_BOOT_TIME_TRUSTLETS_KEY => "boot time trustlets key",
            Self::PSP_AGESA_RESUME_FW => "AGESA resume firmware",
            Self::SMU_OFF_CHIP_FW_2 => "SMU firmware 2",
            Self::PSP_S3_NV_DATA => "PSP S3 NV data",
            _ => "unknown",
        }
    }
}

impl fmt::Debug for PspEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} ({})", self.0, self.name())
    }
}

impl fmt::Display for PspEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Scans `addresses` in order for a firmware entry table and returns the
/// PSP directory base it points to.
pub fn find_psp_dir_base(mem: &dyn PhysMemory, addresses: &[u32]) -> Result<u32, FwError> {
    for &addr in addresses {
        match read_struct::<FirmwareEntryTable>(mem, u64::from(addr)) {
            Ok(table) if table.signature == FIRMWARE_TABLE_SIGNATURE => {
                let base = table.psp_dir_base;
                log::debug!("Firmware entry table at {addr:#x}, PSP directory at {base:#x}");
                return Ok(base);
            }
            Ok(_) => {}
            Err(e) => log::trace!("No firmware entry table at {addr:#x}: {e}"),
        }
    }
    Err(PspError::DirectoryNotFound.into())
}

/// Fletcher-32 over little-endian 16-bit words. A trailing odd byte is
/// ignored.
pub fn fletcher32(data: &[u8]) -> u32 {
    // Largest block that keeps both sums from overflowing before a fold
    const BLOCK_WORDS: usize = 359;

    let mut c0: u32 = 0xffff;
    let mut c1: u32 = 0xffff;
    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|w| u16::from_le_bytes([w[0], w[1]]))
        .collect();

    for block in words.chunks(BLOCK_WORDS) {
        for &w in block {
            c0 += u32::from(w);
            c1 += c0;
        }
        c0 = (c0 & 0xffff) + (c0 >> 16);
        c1 = (c1 & 0xffff) + (c1 >> 16);
    }
    c0 = (c0 & 0xffff) + (c0 >> 16);
    c1 = (c1 & 0xffff) + (c1 >> 16);
    c1 << 16 | c0
}

/// A PSP directory as read from flash.
#[derive(Clone, Debug)]
pub struct PspDirectory {
    base: u32,
    header: PspDirectoryHeader,
    entries: Vec<PspDirectoryEntry>,
}

impl PspDirectory {
    /// Builds a directory with a valid cookie and checksum.
    pub fn new(base: u32, entries: Vec<PspDirectoryEntry>) -> Result<Self, FwError> {
        let total_entries = u32::try_from(entries.len()).unwrap_or(u32::MAX);
        if total_entries > MAX_PSP_ENTRIES {
            return Err(PspError::TooManyEntries(total_entries).into());
        }
        let mut dir = Self {
            base,
            header: PspDirectoryHeader {
                cookie: PSP_DIRECTORY_COOKIE,
                checksum: 0,
                total_entries,
                reserved: 0,
            },
            entries,
        };
        dir.header.checksum = dir.compute_checksum();
        Ok(dir)
    }

    pub fn read(mem: &dyn PhysMemory, base: u32) -> Result<Self, FwError> {
        let header: PspDirectoryHeader = read_struct(mem, u64::from(base))?;
        let cookie = header.cookie;
        if cookie != PSP_DIRECTORY_COOKIE {
            return Err(PspError::InvalidCookie(cookie).into());
        }
        let count = header.total_entries;
        if count > MAX_PSP_ENTRIES {
            return Err(PspError::TooManyEntries(count).into());
        }

        let entry_size = size_of::<PspDirectoryEntry>();
        let table = u64::from(base) + size_of::<PspDirectoryHeader>() as u64;
        let mut buf = vec![0u8; count as usize * entry_size];
        mem.read_bytes(table, &mut buf)?;
        let entries = buf
            .chunks_exact(entry_size)
            .map(|raw| PspDirectoryEntry::read_from_bytes(raw).map_err(|_| FwError::InvalidAddress(table)))
            .collect::<Result<Vec<_>, _>>()?;

        let dir = Self {
            base,
            header,
            entries,
        };
        if !dir.verify_checksum() {
            log::warn!(
                "PSP directory at {base:#x}: checksum mismatch (stored {:#010x}, computed {:#010x})",
                dir.checksum(),
                dir.compute_checksum()
            );
        }
        Ok(dir)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn checksum(&self) -> u32 {
        self.header.checksum
    }

    pub fn entries(&self) -> &[PspDirectoryEntry] {
        &self.entries
    }

    /// First entry of type `entry_type`.
    pub fn find(&self, entry_type: PspEntryType) -> Option<&PspDirectoryEntry> {
        self.entries.iter().find(|e| e.kind() == entry_type)
    }

    /// Fletcher-32 from the entry count field to the end of the entry table.
    pub fn compute_checksum(&self) -> u32 {
        let mut data = Vec::with_capacity(8 + self.entries.len() * size_of::<PspDirectoryEntry>());
        data.extend_from_slice(&self.header.as_bytes()[8..]);
        for entry in &self.entries {
            data.extend_from_slice(entry.as_bytes());
        }
        fletcher32(&data)
    }

    pub fn verify_checksum(&self) -> bool {
        self.compute_checksum() == self.checksum()
    }

    /// On-flash representation: header followed by the entry table.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::from(self.header.as_bytes());
        for entry in &self.entries {
            data.extend_from_slice(entry.as_bytes());
        }
        data
    }
}
