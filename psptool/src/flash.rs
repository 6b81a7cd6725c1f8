// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use fwinit::error::FwError;
use fwinit::mem::PhysMemory;
use std::fmt;

/// End of the 32-bit physical address space, where the flash is decoded.
const FLASH_TOP: u64 = 1 << 32;

#[derive(Debug)]
pub enum FlashError {
    Empty,
    /// Image larger than the 4GiB decode window
    TooLarge(usize),
    /// Image would extend past the end of the address space
    InvalidBase(u64),
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "flash image is empty"),
            Self::TooLarge(len) => write!(f, "flash image of {len:#x} bytes does not fit below 4GiB"),
            Self::InvalidBase(base) => write!(f, "image cannot be mapped at {base:#x}"),
        }
    }
}

impl std::error::Error for FlashError {}

/// A flash image mapped read-only into the physical address space.
#[derive(Debug)]
pub struct FlashImage {
    data: Vec<u8>,
    base: u64,
}

impl FlashImage {
    pub fn new(data: Vec<u8>, base: Option<u64>) -> Result<Self, FlashError> {
        if data.is_empty() {
            return Err(FlashError::Empty);
        }
        let len = u64::try_from(data.len())
            .ok()
            .filter(|len| *len <= FLASH_TOP)
            .ok_or(FlashError::TooLarge(data.len()))?;
        let base = base.unwrap_or(FLASH_TOP - len);
        if base.checked_add(len).is_none() {
            return Err(FlashError::InvalidBase(base));
        }
        Ok(Self { data, base })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn slice(&self, addr: u64, len: usize) -> Result<&[u8], FwError> {
        let start = addr
            .checked_sub(self.base)
            .and_then(|off| usize::try_from(off).ok())
            .ok_or(FwError::InvalidAddress(addr))?;
        start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or(FwError::InvalidAddress(addr))
    }

    /// Contents of a directory entry. Locations below the image base are
    /// taken as offsets from the start of the image.
    pub fn entry_bytes(&self, location: u64, size: u32) -> Result<&[u8], FwError> {
        let len = usize::try_from(size).map_err(|_| FwError::InvalidAddress(location))?;
        if location >= self.base {
            self.slice(location, len)
        } else {
            let addr = self
                .base
                .checked_add(location)
                .ok_or(FwError::InvalidAddress(location))?;
            self.slice(addr, len)
        }
    }

    fn read_array<const N: usize>(&self, addr: u64) -> Result<[u8; N], FwError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.slice(addr, N)?);
        Ok(buf)
    }
}

impl PhysMemory for FlashImage {
    fn read_u8(&self, addr: u64) -> Result<u8, FwError> {
        self.read_array::<1>(addr).map(|b| b[0])
    }

    fn read_u16(&self, addr: u64) -> Result<u16, FwError> {
        self.read_array(addr).map(u16::from_le_bytes)
    }

    fn read_u32(&self, addr: u64) -> Result<u32, FwError> {
        self.read_array(addr).map(u32::from_le_bytes)
    }

    fn read_u64(&self, addr: u64) -> Result<u64, FwError> {
        self.read_array(addr).map(u64::from_le_bytes)
    }

    fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<(), FwError> {
        buf.copy_from_slice(self.slice(addr, buf.len())?);
        Ok(())
    }

    // Flash is read-only
    fn write_u8(&self, addr: u64, _val: u8) -> Result<(), FwError> {
        Err(FwError::InvalidAddress(addr))
    }

    fn write_u16(&self, addr: u64, _val: u16) -> Result<(), FwError> {
        Err(FwError::InvalidAddress(addr))
    }

    fn write_u32(&self, addr: u64, _val: u32) -> Result<(), FwError> {
        Err(FwError::InvalidAddress(addr))
    }
}
