// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::msr::{read_msr, write_msr, MSR_EFER};
use bitflags::bitflags;
use core::arch::asm;
use core::convert::identity;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CR0Flags: u64 {
        const PE = 1 << 0;  // Protection Enabled
        const MP = 1 << 1;  // Monitor Coprocessor
        const EM = 1 << 2;  // Emulation
        const TS = 1 << 3;  // Task Switched
        const ET = 1 << 4;  // Extension Type
        const NE = 1 << 5;  // Numeric Error
        const WP = 1 << 16; // Write Protect
        const AM = 1 << 18; // Alignment Mask
        const NW = 1 << 29; // Not Writethrough
        const CD = 1 << 30; // Cache Disable
        const PG = 1 << 31; // Paging
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CR3Flags: u64 {
        const PWT = 1 << 3; // Page-level Write-Through
        const PCD = 1 << 4; // Page-level Cache Disable
    }
}

/// PCID field of CR3 when CR4.PCIDE is set.
pub const CR3_PCID_MASK: u64 = 0xfff;

bitflags! {
    /// CR4 bits that firmware sets up before handing over to a payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CR4Flags: u64 {
        const DE         = 1 << 3;  // Debugging Extensions
        const PSE        = 1 << 4;  // Page Size Extensions
        const PAE        = 1 << 5;  // Physical-Address Extension
        const MCE        = 1 << 6;  // Machine Check Enable
        const PGE        = 1 << 7;  // Page-Global Enable
        const OSFXSR     = 1 << 9;  // FXSAVE/FXRSTOR support
        const OSXMMEXCPT = 1 << 10; // Unmasked SIMD FP exceptions
        const LA57       = 1 << 12; // 5-level paging
        const FSGSBASE   = 1 << 16; // RD/WR FS/GS base instructions
        const PCIDE      = 1 << 17; // Process Context Identifiers
        const OSXSAVE    = 1 << 18; // XSAVE enable
        const SMEP       = 1 << 20; // Supervisor Mode Execution Prevention
        const SMAP       = 1 << 21; // Supervisor Mode Access Prevention
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EFERFlags: u64 {
        const SCE   = 1 << 0;  // System Call Extensions
        const LME   = 1 << 8;  // Long Mode Enable
        const LMA   = 1 << 10; // Long Mode Active
        const NXE   = 1 << 11; // No-Execute Enable
        const SVME  = 1 << 12; // Secure Virtual Machine Enable
        const LMSLE = 1 << 13; // Long Mode Segment Limit Enable
        const FFXSR = 1 << 14; // Fast FXSAVE/FXRSTOR
        const TCE   = 1 << 15; // Translation Cache Extension
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RFlags: u64 {
        const CF   = 1 << 0;  // Carry
        const RSVD1 = 1 << 1; // Always one
        const PF   = 1 << 2;  // Parity
        const AF   = 1 << 4;  // Auxiliary carry
        const ZF   = 1 << 6;  // Zero
        const SF   = 1 << 7;  // Sign
        const TF   = 1 << 8;  // Trap
        const IF   = 1 << 9;  // Interrupt enable
        const DF   = 1 << 10; // Direction
        const OF   = 1 << 11; // Overflow
        const IOPL = 3 << 12; // I/O privilege level
        const NT   = 1 << 14; // Nested task
        const RF   = 1 << 16; // Resume
        const VM   = 1 << 17; // Virtual-8086 mode
        const AC   = 1 << 18; // Alignment check
        const VIF  = 1 << 19; // Virtual interrupt
        const VIP  = 1 << 20; // Virtual interrupt pending
        const ID   = 1 << 21; // CPUID available
    }
}

impl CR0Flags {
    /// CR0 with caches disabled, as required while reprogramming MTRRs.
    pub fn caches_disabled(self) -> Self {
        (self | Self::CD) - Self::NW
    }
}

macro_rules! control_register {
    ($read:ident, $write:ident, $reg:literal, $ty:ty, $from:expr, $to:expr) => {
        #[inline]
        pub fn $read() -> $ty {
            let val: u64;
            // SAFETY: reading a control register has no side effects.
            unsafe {
                asm!(concat!("mov %", $reg, ", {}"), out(reg) val, options(att_syntax, nomem, nostack, preserves_flags));
            }
            $from(val)
        }

        /// # Safety
        ///
        /// The caller must not change state the running code depends on,
        /// such as paging enables or the active page table.
        #[inline]
        pub unsafe fn $write(val: $ty) {
            let raw: u64 = $to(val);
            // SAFETY: upheld by the caller.
            unsafe {
                asm!(concat!("mov {}, %", $reg), in(reg) raw, options(att_syntax, nostack, preserves_flags));
            }
        }
    };
}

control_register!(read_cr0, write_cr0, "cr0", CR0Flags, CR0Flags::from_bits_retain, |f: CR0Flags| f.bits());
control_register!(read_cr3, write_cr3, "cr3", u64, identity, identity);
control_register!(read_cr4, write_cr4, "cr4", CR4Flags, CR4Flags::from_bits_retain, |f: CR4Flags| f.bits());

pub fn read_efer() -> EFERFlags {
    EFERFlags::from_bits_retain(read_msr(MSR_EFER))
}

/// # Safety
///
/// Clearing LME/NXE while paging structures rely on them breaks memory
/// safety; the caller must rule that out.
pub unsafe fn write_efer(efer: EFERFlags) {
    // SAFETY: requirements have to be checked by the caller.
    unsafe { write_msr(MSR_EFER, efer.bits()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cr0_cache_disable() {
        let cr0 = CR0Flags::PE | CR0Flags::PG | CR0Flags::NW;
        let cd = cr0.caches_disabled();
        assert!(cd.contains(CR0Flags::CD));
        assert!(!cd.contains(CR0Flags::NW));
        assert!(cd.contains(CR0Flags::PE | CR0Flags::PG));
    }

    #[test]
    fn flag_positions() {
        assert_eq!(CR0Flags::PG.bits(), 0x8000_0000);
        assert_eq!(CR4Flags::OSXSAVE.bits(), 0x0004_0000);
        assert_eq!(RFlags::IOPL.bits(), 0x3000);
        assert_eq!(EFERFlags::LMA.bits(), 0x400);
    }
}
