// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use core::arch::asm;

// Architectural MSRs
pub const MSR_IA32_TSC: u32 = 0x0000_0010;
pub const MSR_IA32_APIC_BASE: u32 = 0x0000_001b;
pub const MSR_IA32_BIOS_SIGN_ID: u32 = 0x0000_008b;
pub const MSR_IA32_MTRR_CAP: u32 = 0x0000_00fe;
pub const MSR_IA32_SYSENTER_CS: u32 = 0x0000_0174;
pub const MSR_IA32_SYSENTER_ESP: u32 = 0x0000_0175;
pub const MSR_IA32_SYSENTER_EIP: u32 = 0x0000_0176;
pub const MSR_IA32_MISC_ENABLE: u32 = 0x0000_01a0;
pub const MSR_IA32_SMRR_PHYSBASE: u32 = 0x0000_01f2;
pub const MSR_IA32_SMRR_PHYSMASK: u32 = 0x0000_01f3;
pub const MSR_IA32_MTRR_PHYSBASE0: u32 = 0x0000_0200;
pub const MSR_IA32_MTRR_PHYSMASK0: u32 = 0x0000_0201;
pub const MSR_IA32_MTRR_FIX64K_00000: u32 = 0x0000_0250;
pub const MSR_IA32_MTRR_FIX16K_80000: u32 = 0x0000_0258;
pub const MSR_IA32_MTRR_FIX16K_A0000: u32 = 0x0000_0259;
pub const MSR_IA32_MTRR_FIX4K_C0000: u32 = 0x0000_0268;
pub const MSR_IA32_MTRR_FIX4K_F8000: u32 = 0x0000_026f;
pub const MSR_IA32_CR_PAT: u32 = 0x0000_0277;
pub const MSR_IA32_MTRR_DEF_TYPE: u32 = 0x0000_02ff;

pub const MSR_IA32_APIC_BASE_BSP: u64 = 1 << 8;
pub const MSR_IA32_APIC_BASE_X2: u64 = 1 << 10;
pub const MSR_IA32_APIC_BASE_ENABLED: u64 = 1 << 11;

// x86-64 specific MSRs
pub const MSR_EFER: u32 = 0xc000_0080;
pub const MSR_STAR: u32 = 0xc000_0081;
pub const MSR_LSTAR: u32 = 0xc000_0082;
pub const MSR_CSTAR: u32 = 0xc000_0083;
pub const MSR_SYSCALL_MASK: u32 = 0xc000_0084;
pub const MSR_FS_BASE: u32 = 0xc000_0100;
pub const MSR_GS_BASE: u32 = 0xc000_0101;
pub const MSR_KERNEL_GS_BASE: u32 = 0xc000_0102;
pub const MSR_TSC_AUX: u32 = 0xc000_0103;

// AMD specific MSRs
pub const MSR_AMD_SYSCFG: u32 = 0xc001_0010;
pub const MSR_AMD_TOP_MEM: u32 = 0xc001_001a;
pub const MSR_AMD_TOP_MEM2: u32 = 0xc001_001d;
pub const MSR_AMD_SMM_BASE: u32 = 0xc001_0111;
pub const MSR_AMD_SMM_ADDR: u32 = 0xc001_0112;
pub const MSR_AMD_SMM_MASK: u32 = 0xc001_0113;

/// Number of fixed-range MTRR MSRs (one 64K, two 16K, eight 4K).
pub const NUM_FIXED_MTRRS: usize = 11;

/// Returns the MSR indices of all fixed-range MTRRs in address order.
pub const fn fixed_mtrr_msrs() -> [u32; NUM_FIXED_MTRRS] {
    [
        MSR_IA32_MTRR_FIX64K_00000,
        MSR_IA32_MTRR_FIX16K_80000,
        MSR_IA32_MTRR_FIX16K_A0000,
        MSR_IA32_MTRR_FIX4K_C0000,
        MSR_IA32_MTRR_FIX4K_C0000 + 1,
        MSR_IA32_MTRR_FIX4K_C0000 + 2,
        MSR_IA32_MTRR_FIX4K_C0000 + 3,
        MSR_IA32_MTRR_FIX4K_C0000 + 4,
        MSR_IA32_MTRR_FIX4K_C0000 + 5,
        MSR_IA32_MTRR_FIX4K_C0000 + 6,
        MSR_IA32_MTRR_FIX4K_F8000,
    ]
}

/// Returns the (PHYSBASE, PHYSMASK) MSR pair of variable MTRR `n`.
pub const fn variable_mtrr_msrs(n: u32) -> (u32, u32) {
    (
        MSR_IA32_MTRR_PHYSBASE0 + 2 * n,
        MSR_IA32_MTRR_PHYSMASK0 + 2 * n,
    )
}

pub fn read_msr(msr: u32) -> u64 {
    let eax: u32;
    let edx: u32;

    // SAFETY: Inline assembly to read the specified MSR. It does not change
    // any state.
    unsafe {
        asm!("rdmsr",
             in("ecx") msr,
             out("eax") eax,
             out("edx") edx,
             options(att_syntax));
    }
    (eax as u64) | (edx as u64) << 32
}

/// # Safety
///
/// The caller should ensure that the new value in the target MSR doesn't break
/// memory safety. Changing memory types through MTRRs additionally requires
/// caches to be disabled and flushed by the caller.
pub unsafe fn write_msr(msr: u32, val: u64) {
    let eax = val as u32;
    let edx = (val >> 32) as u32;

    // SAFETY: requirements have to be checked by the caller.
    unsafe {
        asm!("wrmsr",
             in("ecx") msr,
             in("eax") eax,
             in("edx") edx,
             options(att_syntax));
    }
}

pub fn rdtsc() -> u64 {
    let eax: u32;
    let edx: u32;

    // SAFETY: Inline assembly to read the TSC. It does not change any state.
    unsafe {
        asm!("rdtsc",
             out("eax") eax,
             out("edx") edx,
             options(att_syntax, nomem, nostack));
    }
    (eax as u64) | (edx as u64) << 32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_mtrr_pairs() {
        assert_eq!(variable_mtrr_msrs(0), (0x200, 0x201));
        assert_eq!(variable_mtrr_msrs(7), (0x20e, 0x20f));
    }

    #[test]
    fn fixed_mtrrs_are_contiguous_4k_block() {
        let msrs = fixed_mtrr_msrs();
        assert_eq!(msrs[0], 0x250);
        assert_eq!(msrs[3..], [0x268, 0x269, 0x26a, 0x26b, 0x26c, 0x26d, 0x26e, 0x26f]);
    }
}
