// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

//! PSP base library.
//!
//! Locates the PSP directory in flash, reports the fused security state of
//! the part and brings up enough of the PSP PCI function (BAR1 and the
//! northbridge routing for it) to reach the mailbox during early boot.

pub mod bar;
pub mod directory;
pub mod fuses;
pub mod mailbox;

pub use directory::{PspDirectory, PspDirectoryEntry, PspEntryType};
pub use fuses::{FuseStatus, PspPartState};
pub use mailbox::MboxStatus;

use crate::config::PspConfig;
use crate::error::FwError;
use crate::mem::PhysMemory;
use crate::pci::indirect::{indirect_read, indirect_write};
use crate::pci::{AccessWidth, PciAddress, PciConfigSpace};
use crate::s3::{BootScript, S3PciConfig};
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PspError {
    /// No firmware entry table at any of the probed addresses
    DirectoryNotFound,
    /// PSP directory header does not carry the `$PSP` cookie
    InvalidCookie(u32),
    /// PSP directory claims more entries than supported
    TooManyEntries(u32),
    /// No directory entry of the requested type
    EntryNotFound(PspEntryType),
    /// PSP not fused in or PCI function absent
    DeviceNotPresent,
    /// BAR reads back as all ones
    BarUnassigned(u16),
    /// BAR1 did not report a size during sizing
    BarSizing,
}

impl From<PspError> for FwError {
    fn from(err: PspError) -> Self {
        Self::Psp(err)
    }
}

impl fmt::Display for PspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryNotFound => write!(f, "no firmware entry table found"),
            Self::InvalidCookie(cookie) => write!(f, "bad directory cookie {cookie:#010x}"),
            Self::TooManyEntries(n) => write!(f, "directory has too many entries ({n})"),
            Self::EntryNotFound(t) => write!(f, "no directory entry of type {t}"),
            Self::DeviceNotPresent => write!(f, "PSP not present"),
            Self::BarUnassigned(reg) => write!(f, "BAR at {reg:#x} unassigned"),
            Self::BarSizing => write!(f, "BAR1 sizing failed"),
        }
    }
}

/// Location and size of a PSP directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PspEntryInfo {
    pub location: u64,
    pub size: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Psp<'a> {
    pci: &'a dyn PciConfigSpace,
    mem: &'a dyn PhysMemory,
    config: PspConfig,
    boot_script: Option<&'a BootScript>,
}

impl<'a> Psp<'a> {
    pub fn new(pci: &'a dyn PciConfigSpace, mem: &'a dyn PhysMemory, config: PspConfig) -> Self {
        Self {
            pci,
            mem,
            config,
            boot_script: None,
        }
    }

    /// Records writes made with S3-save access widths in `script`.
    pub fn with_boot_script(self, script: &'a BootScript) -> Self {
        Self {
            boot_script: Some(script),
            ..self
        }
    }

    pub fn config(&self) -> &PspConfig {
        &self.config
    }

    /// Reads a 32-bit register given in the packed bus/device/function
    /// register layout.
    pub fn pci_read_config(&self, reg: u32) -> Result<u32, FwError> {
        self.pci.read32(PciAddress::from_bdf_register(reg))
    }

    pub fn pci_write_config(&self, reg: u32, val: u32) -> Result<(), FwError> {
        self.pci.write32(PciAddress::from_bdf_register(reg), val)
    }

    /// Reads a 32-bit register of the PSP function.
    pub fn read_psp_config(&self, offset: u16) -> Result<u32, FwError> {
        self.pci.read32(self.config.psp_device.with_register(offset))
    }

    pub fn write_psp_config(&self, offset: u16, val: u32) -> Result<(), FwError> {
        self.pci
            .write32(self.config.psp_device.with_register(offset), val)
    }

    /// Physical address of the PSP directory, taken from the first firmware
    /// entry table found in flash.
    pub fn psp_dir_base(&self) -> Result<u32, FwError> {
        directory::find_psp_dir_base(self.mem, self.config.rom_signature_addresses)
    }

    pub fn psp_directory(&self) -> Result<PspDirectory, FwError> {
        PspDirectory::read(self.mem, self.psp_dir_base()?)
    }

    /// Location and size of the first directory entry of type `entry_type`.
    pub fn entry_info(&self, entry_type: PspEntryType) -> Result<PspEntryInfo, FwError> {
        let dir = self.psp_directory()?;
        let entry = dir
            .find(entry_type)
            .ok_or(PspError::EntryNotFound(entry_type))?;
        Ok(PspEntryInfo {
            location: entry.location,
            size: entry.size,
        })
    }

    /// Reads an indirect register through the index/data pair at `address`.
    /// With an S3-save width the index write is recorded in the attached
    /// boot script, so the resume path leaves the pair selecting the same
    /// register.
    pub fn indirect_read(
        &self,
        address: PciAddress,
        index: u32,
        width: AccessWidth,
    ) -> Result<u32, FwError> {
        match (width.is_s3_save(), self.boot_script) {
            (true, Some(script)) => {
                let s3 = S3PciConfig::new(self.pci, script);
                indirect_read(&s3, address, index, width)
            }
            (true, None) => {
                log::warn!("S3 save requested for {address} but no boot script is attached");
                indirect_read(self.pci, address, index, width)
            }
            (false, _) => indirect_read(self.pci, address, index, width),
        }
    }

    /// Writes an indirect register. With an S3-save width both the index and
    /// the data write are recorded in the attached boot script.
    pub fn indirect_write(
        &self,
        address: PciAddress,
        index: u32,
        width: AccessWidth,
        val: u32,
    ) -> Result<(), FwError> {
        match (width.is_s3_save(), self.boot_script) {
            (true, Some(script)) => {
                let s3 = S3PciConfig::new(self.pci, script);
                indirect_write(&s3, address, index, width, val)
            }
            (true, None) => {
                log::warn!("S3 save requested for {address} but no boot script is attached");
                indirect_write(self.pci, address, index, width, val)
            }
            (false, _) => indirect_write(self.pci, address, index, width, val),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pci::ConfigWidth;
    use crate::psp::directory::{FirmwareEntryTable, FIRMWARE_TABLE_SIGNATURE};
    use crate::testutils::{FakeConfigSpace, FakeMemory};
    use alloc::vec;
    use zerocopy::IntoBytes;

    const DIR_BASE: u32 = 0xff2b_0000;

    /// 512 KiB image: firmware entry table at the first searched location,
    /// PSP directory at `DIR_BASE`.
    fn flash_with_directory() -> FakeMemory {
        let table = FirmwareEntryTable {
            signature: FIRMWARE_TABLE_SIGNATURE,
            imc_rom_base: 0,
            gec_rom_base: 0,
            xhc_rom_base: 0,
            psp_dir_base: DIR_BASE,
        };
        let dir = PspDirectory::new(
            DIR_BASE,
            vec![
                PspDirectoryEntry::new(PspEntryType::AMD_PUBLIC_KEY, 0x240, 0xff2c_0000),
                PspDirectoryEntry::new(PspEntryType::PSP_FW_BOOT_LOADER, 0x8000, 0xff2c_0400),
            ],
        )
        .unwrap();

        let mem = FakeMemory::new();
        mem.add_region(0xfffa_0000, table.as_bytes());
        mem.add_region(u64::from(DIR_BASE), &dir.to_bytes());
        mem
    }

    #[test]
    fn entry_lookup() {
        let cfg = FakeConfigSpace::new();
        let mem = flash_with_directory();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());

        assert_eq!(psp.psp_dir_base(), Ok(DIR_BASE));
        let dir = psp.psp_directory().unwrap();
        assert_eq!(dir.base(), DIR_BASE);
        assert_eq!(dir.entries().len(), 2);
        assert!(dir.verify_checksum());

        assert_eq!(
            psp.entry_info(PspEntryType::PSP_FW_BOOT_LOADER),
            Ok(PspEntryInfo {
                location: 0xff2c_0400,
                size: 0x8000,
            })
        );
        assert_eq!(
            psp.entry_info(PspEntryType::PSP_S3_NV_DATA),
            Err(FwError::Psp(PspError::EntryNotFound(
                PspEntryType::PSP_S3_NV_DATA
            )))
        );
    }

    #[test]
    fn entry_lookup_without_firmware_table() {
        let cfg = FakeConfigSpace::new();
        let mem = FakeMemory::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());

        assert_eq!(
            psp.psp_dir_base(),
            Err(FwError::Psp(PspError::DirectoryNotFound))
        );
        assert_eq!(
            psp.entry_info(PspEntryType::PSP_FW_BOOT_LOADER),
            Err(FwError::Psp(PspError::DirectoryNotFound))
        );
    }

    #[test]
    fn packed_register_access() {
        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 8, 0);
        cfg.write32(PciAddress::new(0, 8, 0, 0), 0x1537_1022).unwrap();
        let mem = FakeMemory::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());

        assert_eq!(psp.pci_read_config(0x4000), Ok(0x1537_1022));
        assert_eq!(psp.read_psp_config(0), Ok(0x1537_1022));
        psp.write_psp_config(0x48, 0x34).unwrap();
        assert_eq!(psp.pci_read_config(0x4048), Ok(0x34));
    }

    #[test]
    fn s3_save_width_records_indirect_write() {
        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 0, 0);
        let mem = FakeMemory::new();
        let script = BootScript::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default()).with_boot_script(&script);

        let index = PciAddress::new(0, 0, 0, 0xb8);
        psp.indirect_write(index, 0x1234, AccessWidth::Width32, 1)
            .unwrap();
        assert!(script.is_empty());

        psp.indirect_write(index, 0x5678, AccessWidth::S3SaveWidth32, 2)
            .unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(cfg.smn(0x5678), Some(2));
        assert_eq!(psp.indirect_read(index, 0x5678, AccessWidth::Width32), Ok(2));

        // Replaying on resume reproduces the SMN write
        let resumed = FakeConfigSpace::new();
        resumed.add_function(0, 0, 0);
        script.replay(&resumed).unwrap();
        assert_eq!(resumed.smn(0x5678), Some(2));
        assert_eq!(
            resumed.writes()[0],
            (index, ConfigWidth::Dword, 0x5678)
        );
    }

    #[test]
    fn s3_save_width_records_indirect_read_index() {
        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 0, 0);
        cfg.set_smn(0x5678, 0xcafe);
        let mem = FakeMemory::new();
        let script = BootScript::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default()).with_boot_script(&script);

        let index = PciAddress::new(0, 0, 0, 0xb8);
        assert_eq!(psp.indirect_read(index, 0x1234, AccessWidth::Width32), Ok(0));
        assert!(script.is_empty());

        assert_eq!(
            psp.indirect_read(index, 0x5678, AccessWidth::S3SaveWidth32),
            Ok(0xcafe)
        );
        assert_eq!(script.len(), 1);

        // Replay restores the index selection only
        let resumed = FakeConfigSpace::new();
        resumed.add_function(0, 0, 0);
        script.replay(&resumed).unwrap();
        assert_eq!(resumed.writes(), vec![(index, ConfigWidth::Dword, 0x5678)]);
    }
}
