// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use core::arch::asm;
use core::fmt::Debug;

/// Legacy x86 port I/O. The default bodies issue `in`/`out` directly;
/// implementations may override them to route accesses elsewhere, for
/// instance to a fake in unit tests.
pub trait IOPort: Sync + Debug {
    fn outb(&self, port: u16, value: u8) {
        // SAFETY: port I/O does not access memory.
        unsafe { asm!("outb %al, %dx", in("dx") port, in("al") value, options(att_syntax, nomem, nostack, preserves_flags)) }
    }

    fn inb(&self, port: u16) -> u8 {
        let value: u8;
        // SAFETY: port I/O does not access memory.
        unsafe { asm!("inb %dx, %al", in("dx") port, out("al") value, options(att_syntax, nomem, nostack, preserves_flags)) }
        value
    }

    fn outw(&self, port: u16, value: u16) {
        // SAFETY: port I/O does not access memory.
        unsafe { asm!("outw %ax, %dx", in("dx") port, in("ax") value, options(att_syntax, nomem, nostack, preserves_flags)) }
    }

    fn inw(&self, port: u16) -> u16 {
        let value: u16;
        // SAFETY: port I/O does not access memory.
        unsafe { asm!("inw %dx, %ax", in("dx") port, out("ax") value, options(att_syntax, nomem, nostack, preserves_flags)) }
        value
    }

    fn outl(&self, port: u16, value: u32) {
        // SAFETY: port I/O does not access memory.
        unsafe { asm!("outl %eax, %dx", in("dx") port, in("eax") value, options(att_syntax, nomem, nostack, preserves_flags)) }
    }

    fn inl(&self, port: u16) -> u32 {
        let value: u32;
        // SAFETY: port I/O does not access memory.
        unsafe { asm!("inl %dx, %eax", in("dx") port, out("eax") value, options(att_syntax, nomem, nostack, preserves_flags)) }
        value
    }
}

/// Port I/O through the `in`/`out` instructions.
#[derive(Default, Debug, Clone, Copy)]
pub struct HwIOPort;

impl IOPort for HwIOPort {}

pub static HW_IO_PORT: HwIOPort = HwIOPort;
