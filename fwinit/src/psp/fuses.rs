// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::Psp;
use crate::error::FwError;
use crate::pci::Smn;
use bitflags::bitflags;

/// SMN address of the PSP fuse status register.
pub const SMU_CC_PSP_FUSES_STATUS: u32 = 0xc001_8000;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FuseStatus: u32 {
        const SECURE                  = 1 << 0;
        const FRA_ENABLE              = 1 << 1; // Field return analysis
        const PROTO                   = 1 << 2;
        const PLATFORM_SECURE_BOOT_EN = 1 << 4;
    }
}

/// Security state of the part, as fused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PspPartState {
    Blank,
    Proto,
    Secure,
    FraMode,
    /// Combination of state fuses with no defined meaning
    Other(u32),
}

impl FuseStatus {
    const STATE_MASK: Self = Self::SECURE.union(Self::FRA_ENABLE).union(Self::PROTO);

    pub fn part_state(&self) -> PspPartState {
        let state = self.intersection(Self::STATE_MASK);
        if state.is_empty() {
            PspPartState::Blank
        } else if state == Self::PROTO {
            PspPartState::Proto
        } else if state == Self::PROTO | Self::SECURE {
            PspPartState::Secure
        } else if state == Self::STATE_MASK {
            PspPartState::FraMode
        } else {
            PspPartState::Other(state.bits())
        }
    }
}

impl Psp<'_> {
    pub fn fuse_status(&self) -> Result<FuseStatus, FwError> {
        let raw = Smn::new(self.pci).read(SMU_CC_PSP_FUSES_STATUS)?;
        Ok(FuseStatus::from_bits_retain(raw))
    }

    /// Whether the PSP has been fused in.
    pub fn device_present(&self) -> Result<bool, FwError> {
        Ok(self.fuse_status()?.contains(FuseStatus::PROTO))
    }

    /// Whether platform secure boot is fused on. Hardware validated boot and
    /// secure S3 depend on it.
    pub fn platform_secure_enabled(&self) -> Result<bool, FwError> {
        Ok(self
            .fuse_status()?
            .contains(FuseStatus::PLATFORM_SECURE_BOOT_EN))
    }

    pub fn part_state(&self) -> Result<PspPartState, FwError> {
        let state = self.fuse_status()?.part_state();
        log::debug!("PSP part state: {state:?}");
        Ok(state)
    }
}
