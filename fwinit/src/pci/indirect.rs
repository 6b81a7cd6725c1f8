// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::{PciAddress, PciConfigSpace, PciError};
use crate::error::FwError;
use crate::locking::SpinLock;

// Index/data pairs are shared hardware state: the index written by one
// caller selects the register the next data access hits. Held across both
// halves of every indirect access.
static INDEX_DATA_LOCK: SpinLock<()> = SpinLock::new(());

/// Access widths understood by the AGESA-style register helpers. The
/// `S3Save` variants perform the same access and additionally ask for the
/// write to be recorded in the S3 boot script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AccessWidth {
    Width8 = 1,
    Width16 = 2,
    Width32 = 3,
    Width64 = 4,
    S3SaveWidth8 = 0x81,
    S3SaveWidth16 = 0x82,
    S3SaveWidth32 = 0x83,
    S3SaveWidth64 = 0x84,
}

impl AccessWidth {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Width8),
            2 => Some(Self::Width16),
            3 => Some(Self::Width32),
            4 => Some(Self::Width64),
            0x81 => Some(Self::S3SaveWidth8),
            0x82 => Some(Self::S3SaveWidth16),
            0x83 => Some(Self::S3SaveWidth32),
            0x84 => Some(Self::S3SaveWidth64),
            _ => None,
        }
    }

    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Access size in bytes.
    pub const fn bytes(self) -> u8 {
        match self {
            Self::Width8 | Self::S3SaveWidth8 => 1,
            Self::Width16 | Self::S3SaveWidth16 => 2,
            Self::Width32 | Self::S3SaveWidth32 => 4,
            Self::Width64 | Self::S3SaveWidth64 => 8,
        }
    }

    pub const fn is_s3_save(self) -> bool {
        (self as u8) & 0x80 != 0
    }

    /// The same width without the S3 save request.
    pub const fn plain(self) -> Self {
        match self {
            Self::Width8 | Self::S3SaveWidth8 => Self::Width8,
            Self::Width16 | Self::S3SaveWidth16 => Self::Width16,
            Self::Width32 | Self::S3SaveWidth32 => Self::Width32,
            Self::Width64 | Self::S3SaveWidth64 => Self::Width64,
        }
    }
}

/// Reads a register of the given width, zero-extended to 32 bits.
pub fn read_width<C: PciConfigSpace + ?Sized>(
    cfg: &C,
    addr: PciAddress,
    width: AccessWidth,
) -> Result<u32, FwError> {
    match width.bytes() {
        1 => cfg.read8(addr).map(u32::from),
        2 => cfg.read16(addr).map(u32::from),
        4 => cfg.read32(addr),
        n => Err(PciError::UnsupportedWidth(n).into()),
    }
}

/// Writes the low `width` bytes of `val` to a register.
pub fn write_width<C: PciConfigSpace + ?Sized>(
    cfg: &C,
    addr: PciAddress,
    width: AccessWidth,
    val: u32,
) -> Result<(), FwError> {
    match width.bytes() {
        1 => cfg.write8(addr, val as u8),
        2 => cfg.write16(addr, val as u16),
        4 => cfg.write32(addr, val),
        n => Err(PciError::UnsupportedWidth(n).into()),
    }
}

/// Reads an indirect register through an index/data pair. The index is
/// written at `addr`; the data register follows it at `addr + width`.
pub fn indirect_read<C: PciConfigSpace + ?Sized>(
    cfg: &C,
    addr: PciAddress,
    index: u32,
    width: AccessWidth,
) -> Result<u32, FwError> {
    let _guard = INDEX_DATA_LOCK.lock();
    write_width(cfg, addr, width, index)?;
    read_width(cfg, addr.offset(u16::from(width.bytes())), width)
}

/// Writes an indirect register through an index/data pair.
pub fn indirect_write<C: PciConfigSpace + ?Sized>(
    cfg: &C,
    addr: PciAddress,
    index: u32,
    width: AccessWidth,
    val: u32,
) -> Result<(), FwError> {
    let _guard = INDEX_DATA_LOCK.lock();
    write_width(cfg, addr, width, index)?;
    write_width(cfg, addr.offset(u16::from(width.bytes())), width, val)
}

/// Index register of the System Management Network window in the root
/// complex (0:0.0). The data register follows at 0xBC.
pub const SMN_INDEX: PciAddress = PciAddress::new(0, 0, 0, 0xb8);

/// Access to the System Management Network, the register fabric behind the
/// root complex that exposes SMU and fuse state.
#[derive(Debug, Clone, Copy)]
pub struct Smn<'a> {
    cfg: &'a dyn PciConfigSpace,
}

impl<'a> Smn<'a> {
    pub const fn new(cfg: &'a dyn PciConfigSpace) -> Self {
        Self { cfg }
    }

    pub fn read(&self, smn_addr: u32) -> Result<u32, FwError> {
        indirect_read(self.cfg, SMN_INDEX, smn_addr, AccessWidth::Width32)
    }

    pub fn write(&self, smn_addr: u32, val: u32) -> Result<(), FwError> {
        indirect_write(self.cfg, SMN_INDEX, smn_addr, AccessWidth::Width32, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::FakeConfigSpace;

    #[test]
    fn width_bytes() {
        assert_eq!(AccessWidth::Width8.bytes(), 1);
        assert_eq!(AccessWidth::S3SaveWidth16.bytes(), 2);
        assert_eq!(AccessWidth::Width32.bytes(), 4);
        assert_eq!(AccessWidth::S3SaveWidth64.bytes(), 8);
        assert!(AccessWidth::S3SaveWidth32.is_s3_save());
        assert!(!AccessWidth::Width32.is_s3_save());
        assert_eq!(AccessWidth::S3SaveWidth32.plain(), AccessWidth::Width32);
        assert_eq!(AccessWidth::from_raw(0x83), Some(AccessWidth::S3SaveWidth32));
        assert_eq!(AccessWidth::from_raw(0), None);
    }

    #[test]
    fn indirect_pair_uses_following_register() {
        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 0, 2);
        let index = PciAddress::new(0, 0, 2, 0xf8);
        indirect_write(&cfg, index, 0x42, AccessWidth::Width32, 0x1234).unwrap();
        assert_eq!(cfg.read32(index), Ok(0x42));
        assert_eq!(cfg.read32(index.offset(4)), Ok(0x1234));

        indirect_write(&cfg, index, 0x7, AccessWidth::Width8, 0x99).unwrap();
        assert_eq!(cfg.read8(index), Ok(0x7));
        assert_eq!(cfg.read8(index.offset(1)), Ok(0x99));
        assert_eq!(
            indirect_read(&cfg, index, 0x7, AccessWidth::Width8),
            Ok(0x99)
        );
    }

    #[test]
    fn sixty_four_bit_config_access_is_rejected() {
        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 0, 0);
        assert_eq!(
            indirect_read(&cfg, SMN_INDEX, 0, AccessWidth::Width64),
            Err(FwError::Pci(PciError::UnsupportedWidth(8)))
        );
    }

    #[test]
    fn smn_round_trip() {
        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 0, 0);
        cfg.set_smn(0xc001_8000, 0x15);
        let smn = Smn::new(&cfg);
        assert_eq!(smn.read(0xc001_8000), Ok(0x15));
        smn.write(0x5a00_0000, 0xabcd).unwrap();
        assert_eq!(cfg.smn(0x5a00_0000), Some(0xabcd));
        assert_eq!(cfg.read32(SMN_INDEX), Ok(0x5a00_0000));
    }

    #[test]
    fn concurrent_smn_reads_keep_index_and_data_paired() {
        extern crate std;

        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 0, 0);
        cfg.set_smn(0x1000, 0xaaaa);
        cfg.set_smn(0x2000, 0xbbbb);

        let mismatches = |smn_addr: u32, expected: u32| {
            let smn = Smn::new(&cfg);
            (0..20_000)
                .filter(|_| smn.read(smn_addr) != Ok(expected))
                .count()
        };
        let (a, b) = std::thread::scope(|s| {
            let a = s.spawn(|| mismatches(0x1000, 0xaaaa));
            let b = s.spawn(|| mismatches(0x2000, 0xbbbb));
            (a.join().unwrap(), b.join().unwrap())
        });
        assert_eq!(a + b, 0);
    }
}
