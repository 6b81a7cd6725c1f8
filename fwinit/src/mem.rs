// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

extern crate alloc;

use crate::error::FwError;
use alloc::vec;
use core::fmt::Debug;
use core::mem::size_of;
use core::ptr;
use zerocopy::FromBytes;

/// Access to the physical address space: flash mapped below 4GiB, MMIO
/// BARs and the ECAM window.
///
/// Register-sized accessors must perform a single access of that width.
pub trait PhysMemory: Debug {
    fn read_u8(&self, addr: u64) -> Result<u8, FwError>;
    fn read_u16(&self, addr: u64) -> Result<u16, FwError>;
    fn read_u32(&self, addr: u64) -> Result<u32, FwError>;
    fn write_u8(&self, addr: u64, val: u8) -> Result<(), FwError>;
    fn write_u16(&self, addr: u64, val: u16) -> Result<(), FwError>;
    fn write_u32(&self, addr: u64, val: u32) -> Result<(), FwError>;

    fn read_u64(&self, addr: u64) -> Result<u64, FwError> {
        let lo = self.read_u32(addr)?;
        let hi = self.read_u32(addr.checked_add(4).ok_or(FwError::InvalidAddress(addr))?)?;
        Ok(u64::from(lo) | u64::from(hi) << 32)
    }

    fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<(), FwError> {
        for (i, byte) in buf.iter_mut().enumerate() {
            let a = addr
                .checked_add(i as u64)
                .ok_or(FwError::InvalidAddress(addr))?;
            *byte = self.read_u8(a)?;
        }
        Ok(())
    }
}

/// Reads an instance of `T` from physical memory.
pub fn read_struct<T: FromBytes>(mem: &dyn PhysMemory, addr: u64) -> Result<T, FwError> {
    let mut buffer = vec![0u8; size_of::<T>()];
    mem.read_bytes(addr, &mut buffer)?;
    T::read_from_bytes(buffer.as_slice()).map_err(|_| FwError::InvalidAddress(addr))
}

/// Identity-mapped physical memory accessed with volatile loads and stores.
#[derive(Debug)]
pub struct DirectMemory {
    _private: (),
}

impl DirectMemory {
    /// # Safety
    ///
    /// The caller must guarantee that physical addresses passed to the
    /// accessors are identity mapped and that accessing them has no side
    /// effects on memory owned by Rust.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn ptr<T>(addr: u64) -> Result<*mut T, FwError> {
        let a = usize::try_from(addr).map_err(|_| FwError::InvalidAddress(addr))?;
        if a % size_of::<T>() != 0 {
            return Err(FwError::InvalidAddress(addr));
        }
        Ok(a as *mut T)
    }
}

impl PhysMemory for DirectMemory {
    fn read_u8(&self, addr: u64) -> Result<u8, FwError> {
        let p = Self::ptr::<u8>(addr)?;
        // SAFETY: the constructor contract guarantees the address is mapped.
        Ok(unsafe { ptr::read_volatile(p) })
    }

    fn read_u16(&self, addr: u64) -> Result<u16, FwError> {
        let p = Self::ptr::<u16>(addr)?;
        // SAFETY: mapped per the constructor contract, alignment checked.
        Ok(unsafe { ptr::read_volatile(p) })
    }

    fn read_u32(&self, addr: u64) -> Result<u32, FwError> {
        let p = Self::ptr::<u32>(addr)?;
        // SAFETY: mapped per the constructor contract, alignment checked.
        Ok(unsafe { ptr::read_volatile(p) })
    }

    fn write_u8(&self, addr: u64, val: u8) -> Result<(), FwError> {
        let p = Self::ptr::<u8>(addr)?;
        // SAFETY: the constructor contract guarantees the address is mapped.
        unsafe { ptr::write_volatile(p, val) };
        Ok(())
    }

    fn write_u16(&self, addr: u64, val: u16) -> Result<(), FwError> {
        let p = Self::ptr::<u16>(addr)?;
        // SAFETY: mapped per the constructor contract, alignment checked.
        unsafe { ptr::write_volatile(p, val) };
        Ok(())
    }

    fn write_u32(&self, addr: u64, val: u32) -> Result<(), FwError> {
        let p = Self::ptr::<u32>(addr)?;
        // SAFETY: mapped per the constructor contract, alignment checked.
        unsafe { ptr::write_volatile(p, val) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::FakeMemory;
    use zerocopy::{Immutable, KnownLayout};

    #[derive(FromBytes, Debug, Immutable, KnownLayout)]
    #[repr(C)]
    struct Pair {
        a: u32,
        b: u32,
    }

    #[test]
    fn read_u64_and_struct() {
        let mem = FakeMemory::new();
        mem.add_region(0x1000, &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(mem.read_u64(0x1000), Ok(0x2_0000_0001));

        let pair: Pair = read_struct(&mem, 0x1000).unwrap();
        assert_eq!((pair.a, pair.b), (1, 2));
    }

    #[test]
    fn read_past_region_fails() {
        let mem = FakeMemory::new();
        mem.add_region(0x1000, &[0; 4]);
        assert_eq!(
            read_struct::<Pair>(&mem, 0x1000).unwrap_err(),
            FwError::InvalidAddress(0x1004)
        );
    }

    #[test]
    fn direct_memory_reads_local_buffer() {
        let value: u32 = 0x55aa_55aa;
        // SAFETY: the address refers to a live local variable.
        let mem = unsafe { DirectMemory::new() };
        let addr = ptr::addr_of!(value) as u64;
        assert_eq!(mem.read_u32(addr), Ok(0x55aa_55aa));
        assert_eq!(mem.read_u32(addr + 1), Err(FwError::InvalidAddress(addr + 1)));
    }
}
