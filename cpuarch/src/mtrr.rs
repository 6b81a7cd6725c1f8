// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

//! Memory Type Range Register encodings.
//!
//! Variable-range MTRRs describe a naturally aligned, power-of-two sized
//! window of physical memory through a PHYSBASE/PHYSMASK pair. Firmware
//! programs them while caching is disabled, before DRAM is handed over.

use bitfield_struct::bitfield;

const PAGE_MASK: u64 = 0xfff;

/// Valid bit of a PHYSMASK register.
pub const MTRR_PHYSMASK_VALID: u64 = 1 << 11;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MemoryType {
    Uncacheable = 0,
    WriteCombining = 1,
    WriteThrough = 4,
    WriteProtected = 5,
    WriteBack = 6,
}

impl TryFrom<u8> for MemoryType {
    type Error = MtrrError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(Self::Uncacheable),
            1 => Ok(Self::WriteCombining),
            4 => Ok(Self::WriteThrough),
            5 => Ok(Self::WriteProtected),
            6 => Ok(Self::WriteBack),
            _ => Err(MtrrError::InvalidType(val)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MtrrError {
    /// Reserved memory type encoding
    InvalidType(u8),
    /// Size is not a power of two of at least 4KiB
    InvalidSize(u64),
    /// Base is not aligned to the size of the range
    Misaligned(u64),
    /// Range exceeds the physical address width
    OutOfRange,
    /// Unsupported physical address width
    InvalidAddressWidth(u8),
}

/// IA32_MTRRCAP
#[bitfield(u64)]
pub struct MtrrCap {
    /// Number of variable-range MTRRs
    pub vcnt: u8,
    /// Fixed-range MTRRs supported
    pub fix: bool,
    rsvd_9: bool,
    /// Write-combining memory type supported
    pub wc: bool,
    /// SMRR interface supported
    pub smrr: bool,
    #[bits(52)]
    rsvd_63_12: u64,
}

/// IA32_MTRR_DEF_TYPE
#[bitfield(u64)]
pub struct MtrrDefType {
    /// Default memory type for ranges not covered by any MTRR
    pub default_type: u8,
    #[bits(2)]
    rsvd_9_8: u8,
    /// Fixed-range MTRRs enable
    pub fixed_enable: bool,
    /// MTRR enable
    pub enable: bool,
    #[bits(52)]
    rsvd_63_12: u64,
}

impl MtrrDefType {
    pub fn memory_type(&self) -> Result<MemoryType, MtrrError> {
        MemoryType::try_from(self.default_type())
    }
}

/// Register values of a single variable-range MTRR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariableMtrr {
    base: u64,
    mask: u64,
    phys_addr_bits: u8,
}

fn phys_mask(phys_addr_bits: u8) -> Result<u64, MtrrError> {
    if !(36..=52).contains(&phys_addr_bits) {
        return Err(MtrrError::InvalidAddressWidth(phys_addr_bits));
    }
    Ok((1u64 << phys_addr_bits) - 1)
}

impl VariableMtrr {
    pub fn for_range(
        base: u64,
        size: u64,
        mem_type: MemoryType,
        phys_addr_bits: u8,
    ) -> Result<Self, MtrrError> {
        let pmask = phys_mask(phys_addr_bits)?;

        if !size.is_power_of_two() || size <= PAGE_MASK {
            return Err(MtrrError::InvalidSize(size));
        }
        if base & (size - 1) != 0 {
            return Err(MtrrError::Misaligned(base));
        }
        let end = base.checked_add(size).ok_or(MtrrError::OutOfRange)?;
        if end > pmask + 1 {
            return Err(MtrrError::OutOfRange);
        }

        Ok(Self {
            base: base | mem_type as u64,
            mask: (!(size - 1) & pmask & !PAGE_MASK) | MTRR_PHYSMASK_VALID,
            phys_addr_bits,
        })
    }

    /// Decodes a PHYSBASE/PHYSMASK pair. Returns `Ok(None)` if the pair is
    /// not marked valid.
    pub fn from_msrs(base: u64, mask: u64, phys_addr_bits: u8) -> Result<Option<Self>, MtrrError> {
        phys_mask(phys_addr_bits)?;
        if mask & MTRR_PHYSMASK_VALID == 0 {
            return Ok(None);
        }
        MemoryType::try_from(base as u8)?;
        Ok(Some(Self {
            base,
            mask,
            phys_addr_bits,
        }))
    }

    pub fn base_msr_value(&self) -> u64 {
        self.base
    }

    pub fn mask_msr_value(&self) -> u64 {
        self.mask
    }

    pub fn memory_type(&self) -> MemoryType {
        // The type was validated on construction
        MemoryType::try_from(self.base as u8).unwrap_or(MemoryType::Uncacheable)
    }

    /// Returns the (base, size) of the covered physical range.
    pub fn range(&self) -> (u64, u64) {
        let pmask = (1u64 << self.phys_addr_bits) - 1;
        let base = self.base & pmask & !PAGE_MASK;
        let size = (!(self.mask & pmask & !PAGE_MASK) & pmask) + 1;
        (base, size)
    }
}

/// Splits an arbitrary page-aligned range into the naturally aligned
/// power-of-two blocks a set of variable MTRRs can describe.
#[derive(Clone, Copy, Debug)]
pub struct MtrrRangeSplit {
    base: u64,
    remaining: u64,
}

impl MtrrRangeSplit {
    pub fn new(base: u64, size: u64) -> Result<Self, MtrrError> {
        if base & PAGE_MASK != 0 {
            return Err(MtrrError::Misaligned(base));
        }
        if size & PAGE_MASK != 0 {
            return Err(MtrrError::InvalidSize(size));
        }
        base.checked_add(size).ok_or(MtrrError::OutOfRange)?;
        Ok(Self {
            base,
            remaining: size,
        })
    }
}

impl Iterator for MtrrRangeSplit {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // Largest block allowed by the alignment of base
        let align = if self.base == 0 {
            1u64 << 63
        } else {
            1u64 << self.base.trailing_zeros()
        };
        // Largest power of two not exceeding what is left
        let fit = 1u64 << (63 - self.remaining.leading_zeros());
        let size = align.min(fit);

        let block = (self.base, size);
        self.base += size;
        self.remaining -= size;
        Some(block)
    }
}
