// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::{ConfigWidth, PciAddress, PciConfigSpace, PciError};
use crate::error::FwError;
use crate::io::{IOPort, HW_IO_PORT};
use crate::locking::SpinLock;

pub const PCI_CONFIG_ADDRESS_PORT: u16 = 0xcf8;
pub const PCI_CONFIG_DATA_PORT: u16 = 0xcfc;

/// Configuration mechanism #1 on the executing platform.
pub static PCI_CF8: PciCf8<'static> = PciCf8::new(&HW_IO_PORT);

/// Configuration mechanism #1: configuration cycles through the I/O port
/// pair 0xCF8/0xCFC. Only segment 0 and the first 256 bytes of each
/// function are reachable.
#[derive(Debug)]
pub struct PciCf8<'a> {
    driver: &'a dyn IOPort,
    // Serializes the address/data cycle
    lock: SpinLock<()>,
}

impl<'a> PciCf8<'a> {
    pub const fn new(driver: &'a dyn IOPort) -> Self {
        Self {
            driver,
            lock: SpinLock::new(()),
        }
    }

    fn check(addr: PciAddress, width: ConfigWidth) -> Result<u16, PciError> {
        if addr.segment() != 0 {
            return Err(PciError::UnsupportedSegment(addr.segment()));
        }
        if addr.register() >= 0x100 {
            return Err(PciError::InvalidRegister(addr));
        }
        if !addr.is_aligned(width) {
            return Err(PciError::Unaligned(addr));
        }
        Ok(PCI_CONFIG_DATA_PORT + (addr.register() & 3))
    }

    fn select(&self, addr: PciAddress) {
        self.driver.outl(PCI_CONFIG_ADDRESS_PORT, addr.cf8_value());
    }
}

impl PciConfigSpace for PciCf8<'_> {
    fn read8(&self, addr: PciAddress) -> Result<u8, FwError> {
        let port = Self::check(addr, ConfigWidth::Byte)?;
        let _guard = self.lock.lock();
        self.select(addr);
        Ok(self.driver.inb(port))
    }

    fn read16(&self, addr: PciAddress) -> Result<u16, FwError> {
        let port = Self::check(addr, ConfigWidth::Word)?;
        let _guard = self.lock.lock();
        self.select(addr);
        Ok(self.driver.inw(port))
    }

    fn read32(&self, addr: PciAddress) -> Result<u32, FwError> {
        let port = Self::check(addr, ConfigWidth::Dword)?;
        let _guard = self.lock.lock();
        self.select(addr);
        Ok(self.driver.inl(port))
    }

    fn write8(&self, addr: PciAddress, val: u8) -> Result<(), FwError> {
        let port = Self::check(addr, ConfigWidth::Byte)?;
        let _guard = self.lock.lock();
        self.select(addr);
        self.driver.outb(port, val);
        Ok(())
    }

    fn write16(&self, addr: PciAddress, val: u16) -> Result<(), FwError> {
        let port = Self::check(addr, ConfigWidth::Word)?;
        let _guard = self.lock.lock();
        self.select(addr);
        self.driver.outw(port, val);
        Ok(())
    }

    fn write32(&self, addr: PciAddress, val: u32) -> Result<(), FwError> {
        let port = Self::check(addr, ConfigWidth::Dword)?;
        let _guard = self.lock.lock();
        self.select(addr);
        self.driver.outl(port, val);
        Ok(())
    }
}
