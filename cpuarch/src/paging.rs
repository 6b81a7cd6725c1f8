// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use bitflags::bitflags;

pub const PAGE_SIZE: u64 = 4096;
pub const PAGE_SIZE_2M: u64 = PAGE_SIZE * 512;
pub const PAGE_SIZE_1G: u64 = PAGE_SIZE_2M * 512;

/// Physical address bits 12..51 of an entry.
pub const PTE_ADDR_MASK: u64 = 0x000f_ffff_ffff_f000;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct PTEntryFlags: u64 {
        const PRESENT       = 1 << 0;
        const WRITABLE      = 1 << 1;
        const USER          = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const NO_CACHE      = 1 << 4;
        const ACCESSED      = 1 << 5;
        const DIRTY         = 1 << 6;
        const HUGE          = 1 << 7;
        const GLOBAL        = 1 << 8;
        const NX            = 1 << 63;
    }
}

impl PTEntryFlags {
    pub fn exec() -> Self {
        Self::PRESENT | Self::GLOBAL | Self::ACCESSED | Self::DIRTY
    }

    pub fn data() -> Self {
        Self::PRESENT | Self::GLOBAL | Self::WRITABLE | Self::NX | Self::ACCESSED | Self::DIRTY
    }

    /// Uncached data mapping for MMIO such as a PSP BAR.
    pub fn mmio() -> Self {
        Self::data() | Self::NO_CACHE | Self::WRITE_THROUGH
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PTEntry(u64);

impl PTEntry {
    pub fn new(addr: u64, flags: PTEntryFlags) -> Self {
        Self((addr & PTE_ADDR_MASK) | flags.bits())
    }

    pub fn is_clear(&self) -> bool {
        self.0 == 0
    }

    pub fn is_present(&self) -> bool {
        self.flags().contains(PTEntryFlags::PRESENT)
    }

    pub fn is_huge(&self) -> bool {
        self.flags().contains(PTEntryFlags::HUGE)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn flags(&self) -> PTEntryFlags {
        PTEntryFlags::from_bits_truncate(self.0)
    }

    pub fn address(&self) -> u64 {
        self.0 & PTE_ADDR_MASK
    }
}
