// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::{ConfigWidth, PciAddress, PciConfigSpace, PciError};
use crate::error::FwError;
use crate::mem::PhysMemory;

/// Default base of the memory-mapped configuration window.
pub const MMIO_CFG_BASE: u64 = 0xe000_0000;

/// Enhanced configuration access: each function's 4KiB configuration space
/// is mapped at `base + (bus << 20 | device << 15 | function << 12)`.
#[derive(Debug)]
pub struct PciEcam<'a> {
    mem: &'a dyn PhysMemory,
    base: u64,
}

impl<'a> PciEcam<'a> {
    pub const fn new(mem: &'a dyn PhysMemory, base: u64) -> Self {
        Self { mem, base }
    }

    pub const fn base(&self) -> u64 {
        self.base
    }

    fn mmio_addr(&self, addr: PciAddress, width: ConfigWidth) -> Result<u64, PciError> {
        if addr.segment() != 0 {
            return Err(PciError::UnsupportedSegment(addr.segment()));
        }
        if !addr.is_aligned(width) {
            return Err(PciError::Unaligned(addr));
        }
        Ok(self.base + addr.ecam_offset())
    }
}

impl PciConfigSpace for PciEcam<'_> {
    fn read8(&self, addr: PciAddress) -> Result<u8, FwError> {
        self.mem.read_u8(self.mmio_addr(addr, ConfigWidth::Byte)?)
    }

    fn read16(&self, addr: PciAddress) -> Result<u16, FwError> {
        self.mem.read_u16(self.mmio_addr(addr, ConfigWidth::Word)?)
    }

    fn read32(&self, addr: PciAddress) -> Result<u32, FwError> {
        self.mem.read_u32(self.mmio_addr(addr, ConfigWidth::Dword)?)
    }

    fn write8(&self, addr: PciAddress, val: u8) -> Result<(), FwError> {
        self.mem.write_u8(self.mmio_addr(addr, ConfigWidth::Byte)?, val)
    }

    fn write16(&self, addr: PciAddress, val: u16) -> Result<(), FwError> {
        self.mem.write_u16(self.mmio_addr(addr, ConfigWidth::Word)?, val)
    }

    fn write32(&self, addr: PciAddress, val: u32) -> Result<(), FwError> {
        self.mem.write_u32(self.mmio_addr(addr, ConfigWidth::Dword)?, val)
    }
}
