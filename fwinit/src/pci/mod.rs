// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

//! PCI configuration space addressing and access.
//!
//! A function's configuration registers are identified by a [`PciAddress`].
//! Different firmware components pack that tuple into a 32-bit value in
//! different ways; all encodings used on this platform are provided here so
//! values can be exchanged without hand-rolled shifting at call sites.

pub mod access;
pub mod cf8;
pub mod ecam;
pub mod indirect;

pub use access::{ConfigValue, PciConfigExt, PciConfigSpace};
pub use cf8::{PciCf8, PCI_CF8};
pub use ecam::PciEcam;
pub use indirect::{AccessWidth, Smn};

use crate::error::FwError;
use core::fmt;

/// Largest value accepted by [`PciAddress::from_lib_address`].
pub const PCI_LIB_ADDRESS_MAX: u32 = 0x0fff_ffff;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PciError {
    /// Encoded address has bits set outside the defined layout
    InvalidAddress(u32),
    /// Register offset not reachable through this access method
    InvalidRegister(PciAddress),
    /// Register offset not aligned to the access width
    Unaligned(PciAddress),
    /// Segment other than 0 requested from a segment-0-only accessor
    UnsupportedSegment(u8),
    /// Access width not supported by configuration space
    UnsupportedWidth(u8),
    /// Bit range outside the register or end before start
    InvalidBitField { start: u32, end: u32 },
    /// Value does not fit in the selected bit field
    ValueOutOfRange,
}

impl From<PciError> for FwError {
    fn from(err: PciError) -> Self {
        Self::Pci(err)
    }
}

impl fmt::Display for PciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress(addr) => write!(f, "invalid encoded address {addr:#010x}"),
            Self::InvalidRegister(addr) => write!(f, "register not reachable: {addr}"),
            Self::Unaligned(addr) => write!(f, "unaligned register access: {addr}"),
            Self::UnsupportedSegment(seg) => write!(f, "segment {seg} not supported"),
            Self::UnsupportedWidth(w) => write!(f, "unsupported access width {w}"),
            Self::InvalidBitField { start, end } => {
                write!(f, "invalid bit field {start}..={end}")
            }
            Self::ValueOutOfRange => write!(f, "value does not fit in bit field"),
        }
    }
}

/// Width of a single configuration space access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigWidth {
    Byte,
    Word,
    Dword,
}

impl ConfigWidth {
    pub const fn bytes(self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
        }
    }

    pub const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

/// Segment, bus, device, function and register of a configuration access.
///
/// Construction strips the unused upper bits of every component: bus 8
/// bits, device 5, function 3, register 12 and segment 4.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PciAddress {
    segment: u8,
    bus: u8,
    device: u8,
    function: u8,
    register: u16,
}

impl PciAddress {
    pub const fn new(bus: u8, device: u8, function: u8, register: u16) -> Self {
        Self {
            segment: 0,
            bus,
            device: device & 0x1f,
            function: function & 0x7,
            register: register & 0xfff,
        }
    }

    pub const fn with_segment(self, segment: u8) -> Self {
        Self {
            segment: segment & 0xf,
            ..self
        }
    }

    pub const fn with_register(self, register: u16) -> Self {
        Self {
            register: register & 0xfff,
            ..self
        }
    }

    /// Address `n` bytes further into the same function's config space.
    pub const fn offset(self, n: u16) -> Self {
        self.with_register(self.register.wrapping_add(n))
    }

    pub const fn segment(&self) -> u8 {
        self.segment
    }

    pub const fn bus(&self) -> u8 {
        self.bus
    }

    pub const fn device(&self) -> u8 {
        self.device
    }

    pub const fn function(&self) -> u8 {
        self.function
    }

    pub const fn register(&self) -> u16 {
        self.register
    }

    /// Layout used by the PCI and S3 PCI libraries:
    /// `register | function << 12 | device << 15 | bus << 20`.
    pub const fn lib_address(&self) -> u32 {
        self.register as u32
            | (self.function as u32) << 12
            | (self.device as u32) << 15
            | (self.bus as u32) << 20
    }

    pub const fn from_lib_address(addr: u32) -> Result<Self, PciError> {
        if addr > PCI_LIB_ADDRESS_MAX {
            return Err(PciError::InvalidAddress(addr));
        }
        Ok(Self::new(
            (addr >> 20) as u8,
            (addr >> 15) as u8,
            (addr >> 12) as u8,
            addr as u16,
        ))
    }

    /// AMD library SBDFO layout: the library address with the segment in
    /// bits 28..31.
    pub const fn sbdfo(&self) -> u32 {
        (self.segment as u32) << 28 | self.lib_address()
    }

    pub const fn from_sbdfo(sbdfo: u32) -> Self {
        Self::new(
            (sbdfo >> 20) as u8,
            (sbdfo >> 15) as u8,
            (sbdfo >> 12) as u8,
            sbdfo as u16,
        )
        .with_segment((sbdfo >> 28) as u8)
    }

    /// Packed layout used by the PSP library for register arguments:
    /// bus in bits 16..23, device in 11..15, function in 8..10 and an 8-bit
    /// register offset.
    pub const fn from_bdf_register(reg: u32) -> Self {
        Self::new(
            (reg >> 16) as u8,
            (reg >> 11) as u8,
            (reg >> 8) as u8,
            (reg & 0xff) as u16,
        )
    }

    pub const fn bdf_register(&self) -> u32 {
        (self.bus as u32) << 16
            | (self.device as u32) << 11
            | (self.function as u32) << 8
            | (self.register & 0xff) as u32
    }

    /// Value written to the CONFIG_ADDRESS port (0xCF8) to select the
    /// dword containing this register.
    pub const fn cf8_value(&self) -> u32 {
        0x8000_0000 | (self.bdf_register() & !0x3)
    }

    /// Byte offset of this register within an ECAM window.
    pub const fn ecam_offset(&self) -> u64 {
        (self.bus as u64) << 20
            | (self.device as u64) << 15
            | (self.function as u64) << 12
            | self.register as u64
    }

    pub(crate) const fn is_aligned(&self, width: ConfigWidth) -> bool {
        self.register % width.bytes() == 0
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}+{:#05x}",
            self.segment, self.bus, self.device, self.function, self.register
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn masks_components() {
        let addr = PciAddress::new(0xff, 0x3f, 0xf, 0x1fff);
        assert_eq!(addr.device(), 0x1f);
        assert_eq!(addr.function(), 0x7);
        assert_eq!(addr.register(), 0xfff);
    }

    #[test]
    fn lib_address_layout() {
        let addr = PciAddress::new(0x12, 0x18, 1, 0xbc);
        assert_eq!(addr.lib_address(), 0x12c_10bc);
        assert_eq!(PciAddress::from_lib_address(0x12c_10bc), Ok(addr));
        assert_eq!(
            PciAddress::from_lib_address(0x1000_0000),
            Err(PciError::InvalidAddress(0x1000_0000))
        );
    }

    #[test]
    fn sbdfo_carries_segment() {
        let addr = PciAddress::new(0, 8, 0, 0x18).with_segment(1);
        assert_eq!(addr.sbdfo(), 0x1004_0018);
        assert_eq!(PciAddress::from_sbdfo(0x1004_0018), addr);
    }

    #[test]
    fn bdf_register_layout() {
        // Device 8 function 0 is 0x4000 in the packed layout
        let psp = PciAddress::from_bdf_register(0x4000 + 0x18);
        assert_eq!(psp, PciAddress::new(0, 8, 0, 0x18));
        assert_eq!(psp.bdf_register(), 0x4018);

        let nb = PciAddress::from_bdf_register((0x18 << 11) + (1 << 8) + 0xbc);
        assert_eq!(nb, PciAddress::new(0, 0x18, 1, 0xbc));
    }

    #[test]
    fn cf8_selects_dword() {
        assert_eq!(PciAddress::new(0, 0, 0, 0xb8).cf8_value(), 0x8000_00b8);
        assert_eq!(PciAddress::new(0, 0, 0, 0xbe).cf8_value(), 0x8000_00bc);
        assert_eq!(PciAddress::new(2, 0x1f, 7, 0x40).cf8_value(), 0x8002_ff40);
    }

    #[test]
    fn ecam_and_offset() {
        let addr = PciAddress::new(1, 2, 3, 0x100);
        assert_eq!(addr.ecam_offset(), 0x0011_3100);
        assert_eq!(addr.offset(4).register(), 0x104);
        assert_eq!(format!("{}", addr), "0000:01:02.3+0x100");
    }
}
