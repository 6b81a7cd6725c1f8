// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::Psp;
use crate::error::FwError;
use bitfield_struct::bitfield;

/// Offset of the x86-to-PSP mailbox within BAR1 (C2PMSG_28).
pub const PSP_MAILBOX_BASE: u32 = 0x70;
pub const PSP_MAILBOX_STATUS_OFFSET: u32 = 0x4;

/// Memory BAR type and prefetch bits
const BAR_FLAGS_MASK: u32 = 0xf;

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MboxStatus {
    /// PSP has initialized the mailbox
    pub mbox_initialized: bool,
    /// Last command failed
    pub error: bool,
    /// Last command was terminated
    pub terminated: bool,
    pub halt: bool,
    /// PSP booted in recovery mode
    pub recovery: bool,
    #[bits(27)]
    rsvd_31_5: u32,
}

impl Psp<'_> {
    /// Physical address of the mailbox status word.
    pub fn mailbox_status_addr(&self) -> Result<u64, FwError> {
        let bar1 = self.bar1_addr()? & !BAR_FLAGS_MASK;
        Ok(u64::from(bar1) + u64::from(PSP_MAILBOX_BASE + PSP_MAILBOX_STATUS_OFFSET))
    }

    pub fn mailbox_status(&self) -> Result<MboxStatus, FwError> {
        let addr = self.mailbox_status_addr()?;
        Ok(MboxStatus::from_bits(self.mem.read_u32(addr)?))
    }

    /// Whether the PSP reports recovery mode. Sets up BAR1 first if
    /// firmware has not assigned it yet.
    pub fn recovery_flag(&self) -> Result<bool, FwError> {
        self.bar_init_early()?;
        let status = self.mailbox_status()?;
        if status.recovery() {
            log::warn!("PSP is in recovery mode");
        }
        Ok(status.recovery())
    }
}
