// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::{ConfigWidth, PciAddress, PciError};
use crate::error::FwError;
use core::fmt::Debug;

/// A configuration space access mechanism.
///
/// Implementations must serialize accesses: a read or write is observed by
/// hardware as one atomic configuration cycle.
pub trait PciConfigSpace: Debug {
    fn read8(&self, addr: PciAddress) -> Result<u8, FwError>;
    fn read16(&self, addr: PciAddress) -> Result<u16, FwError>;
    fn read32(&self, addr: PciAddress) -> Result<u32, FwError>;
    fn write8(&self, addr: PciAddress, val: u8) -> Result<(), FwError>;
    fn write16(&self, addr: PciAddress, val: u16) -> Result<(), FwError>;
    fn write32(&self, addr: PciAddress, val: u32) -> Result<(), FwError>;
}

/// Register value types: `u8`, `u16` and `u32`.
pub trait ConfigValue: Copy + Debug + Eq {
    const WIDTH: ConfigWidth;

    fn to_u32(self) -> u32;
    /// Truncates `val` to the register width.
    fn from_u32(val: u32) -> Self;
    fn read_from<C: PciConfigSpace + ?Sized>(cfg: &C, addr: PciAddress) -> Result<Self, FwError>;
    fn write_to<C: PciConfigSpace + ?Sized>(self, cfg: &C, addr: PciAddress) -> Result<(), FwError>;
}

macro_rules! config_value {
    ($ty:ty, $width:expr, $truncate:expr, $read:ident, $write:ident) => {
        impl ConfigValue for $ty {
            const WIDTH: ConfigWidth = $width;

            fn to_u32(self) -> u32 {
                u32::from(self)
            }

            fn from_u32(val: u32) -> Self {
                $truncate(val)
            }

            fn read_from<C: PciConfigSpace + ?Sized>(
                cfg: &C,
                addr: PciAddress,
            ) -> Result<Self, FwError> {
                cfg.$read(addr)
            }

            fn write_to<C: PciConfigSpace + ?Sized>(
                self,
                cfg: &C,
                addr: PciAddress,
            ) -> Result<(), FwError> {
                cfg.$write(addr, self)
            }
        }
    };
}

config_value!(u8, ConfigWidth::Byte, |v: u32| v as u8, read8, write8);
config_value!(u16, ConfigWidth::Word, |v: u32| v as u16, read16, write16);
config_value!(u32, ConfigWidth::Dword, |v: u32| v, read32, write32);

/// Mask covering bits `start..=end` of a register of type `T`.
fn field_mask<T: ConfigValue>(start: u32, end: u32) -> Result<u32, PciError> {
    if start > end || end >= T::WIDTH.bits() {
        return Err(PciError::InvalidBitField { start, end });
    }
    Ok((u32::MAX >> (31 - (end - start))) << start)
}

/// Shifts `val` into the field at `start..=end`, failing if it does not fit.
fn field_value<T: ConfigValue>(start: u32, end: u32, val: T) -> Result<u32, PciError> {
    let mask = field_mask::<T>(start, end)?;
    let max = mask >> start;
    if val.to_u32() > max {
        return Err(PciError::ValueOutOfRange);
    }
    Ok(val.to_u32() << start)
}

/// Width-generic read/modify/write operations. Every operation that writes
/// returns the value written back to the register.
pub trait PciConfigExt: PciConfigSpace {
    fn read<T: ConfigValue>(&self, addr: PciAddress) -> Result<T, FwError> {
        T::read_from(self, addr)
    }

    fn write<T: ConfigValue>(&self, addr: PciAddress, val: T) -> Result<T, FwError> {
        val.write_to(self, addr)?;
        Ok(val)
    }

    fn or<T: ConfigValue>(&self, addr: PciAddress, or: T) -> Result<T, FwError> {
        self.and_then_or(addr, T::from_u32(u32::MAX), or)
    }

    fn and<T: ConfigValue>(&self, addr: PciAddress, and: T) -> Result<T, FwError> {
        self.and_then_or(addr, and, T::from_u32(0))
    }

    fn and_then_or<T: ConfigValue>(&self, addr: PciAddress, and: T, or: T) -> Result<T, FwError> {
        let cur: T = self.read(addr)?;
        let val = T::from_u32((cur.to_u32() & and.to_u32()) | or.to_u32());
        self.write(addr, val)
    }

    /// Returns bits `start..=end` shifted down to bit 0.
    fn bitfield_read<T: ConfigValue>(
        &self,
        addr: PciAddress,
        start: u32,
        end: u32,
    ) -> Result<T, FwError> {
        let mask = field_mask::<T>(start, end)?;
        let cur: T = self.read(addr)?;
        Ok(T::from_u32((cur.to_u32() & mask) >> start))
    }

    fn bitfield_write<T: ConfigValue>(
        &self,
        addr: PciAddress,
        start: u32,
        end: u32,
        val: T,
    ) -> Result<T, FwError> {
        let mask = field_mask::<T>(start, end)?;
        let field = field_value(start, end, val)?;
        let cur: T = self.read(addr)?;
        self.write(addr, T::from_u32((cur.to_u32() & !mask) | field))
    }

    fn bitfield_or<T: ConfigValue>(
        &self,
        addr: PciAddress,
        start: u32,
        end: u32,
        or: T,
    ) -> Result<T, FwError> {
        let field = field_value(start, end, or)?;
        let cur: T = self.read(addr)?;
        self.write(addr, T::from_u32(cur.to_u32() | field))
    }

    fn bitfield_and<T: ConfigValue>(
        &self,
        addr: PciAddress,
        start: u32,
        end: u32,
        and: T,
    ) -> Result<T, FwError> {
        let mask = field_mask::<T>(start, end)?;
        let field = field_value(start, end, and)?;
        let cur: T = self.read(addr)?;
        self.write(addr, T::from_u32(cur.to_u32() & (!mask | field)))
    }

    fn bitfield_and_then_or<T: ConfigValue>(
        &self,
        addr: PciAddress,
        start: u32,
        end: u32,
        and: T,
        or: T,
    ) -> Result<T, FwError> {
        let mask = field_mask::<T>(start, end)?;
        let and_field = field_value(start, end, and)?;
        let or_field = field_value(start, end, or)?;
        let cur: T = self.read(addr)?;
        self.write(
            addr,
            T::from_u32((cur.to_u32() & (!mask | and_field)) | or_field),
        )
    }
}

impl<C: PciConfigSpace + ?Sized> PciConfigExt for C {}
