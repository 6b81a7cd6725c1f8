// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::BootScript;
use crate::error::FwError;
use crate::pci::{ConfigValue, ConfigWidth, PciAddress, PciConfigSpace};

/// Configuration access that records every write in a [`BootScript`].
///
/// Read/modify/write helpers from [`PciConfigExt`](crate::pci::PciConfigExt)
/// work unchanged on top of it: the read half is not recorded and the write
/// half records the final register value, so each operation contributes one
/// entry.
#[derive(Debug, Clone, Copy)]
pub struct S3PciConfig<'a> {
    inner: &'a dyn PciConfigSpace,
    script: &'a BootScript,
}

impl<'a> S3PciConfig<'a> {
    pub const fn new(inner: &'a dyn PciConfigSpace, script: &'a BootScript) -> Self {
        Self { inner, script }
    }

    pub fn script(&self) -> &'a BootScript {
        self.script
    }

    /// Reads a register and records the value read, so the resume path
    /// restores the register to the state observed now.
    pub fn save_read<T: ConfigValue>(&self, addr: PciAddress) -> Result<T, FwError> {
        let val = T::read_from(self.inner, addr)?;
        self.script.save_pci_write(addr, T::WIDTH, val.to_u32());
        Ok(val)
    }
}

impl PciConfigSpace for S3PciConfig<'_> {
    fn read8(&self, addr: PciAddress) -> Result<u8, FwError> {
        self.inner.read8(addr)
    }

    fn read16(&self, addr: PciAddress) -> Result<u16, FwError> {
        self.inner.read16(addr)
    }

    fn read32(&self, addr: PciAddress) -> Result<u32, FwError> {
        self.inner.read32(addr)
    }

    fn write8(&self, addr: PciAddress, val: u8) -> Result<(), FwError> {
        self.inner.write8(addr, val)?;
        self.script
            .save_pci_write(addr, ConfigWidth::Byte, u32::from(val));
        Ok(())
    }

    fn write16(&self, addr: PciAddress, val: u16) -> Result<(), FwError> {
        self.inner.write16(addr, val)?;
        self.script
            .save_pci_write(addr, ConfigWidth::Word, u32::from(val));
        Ok(())
    }

    fn write32(&self, addr: PciAddress, val: u32) -> Result<(), FwError> {
        self.inner.write32(addr, val)?;
        self.script.save_pci_write(addr, ConfigWidth::Dword, val);
        Ok(())
    }
}
