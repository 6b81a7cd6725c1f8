// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use crate::pci::PciAddress;

/// Candidate locations of the firmware entry table, one per supported
/// flash size (512KiB, 1MiB, 2MiB, 4MiB, 8MiB and 16MiB), searched in
/// order.
pub const ROM_SIGNATURE_ADDRESSES: [u32; 6] = [
    0xfffa_0000,
    0xfff2_0000,
    0xffe2_0000,
    0xffc2_0000,
    0xff82_0000,
    0xff02_0000,
];

/// Platform constants used by the PSP base library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PspConfig {
    /// PCI function of the PSP
    pub psp_device: PciAddress,
    /// MMIO address assigned to BAR1 when firmware finds it unassigned
    pub bar1_temp_base: u32,
    /// Locations probed for the firmware entry table
    pub rom_signature_addresses: &'static [u32],
    /// Northbridge function holding the MMIO base/limit pair that routes
    /// the temporary BAR1 window to the PSP
    pub nb_mmio_function: PciAddress,
}

impl Default for PspConfig {
    fn default() -> Self {
        Self {
            psp_device: PciAddress::new(0, 8, 0, 0),
            bar1_temp_base: 0xfea0_0000,
            rom_signature_addresses: &ROM_SIGNATURE_ADDRESSES,
            nb_mmio_function: PciAddress::new(0, 0x18, 1, 0),
        }
    }
}
