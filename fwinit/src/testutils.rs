// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

extern crate alloc;

use crate::error::FwError;
use crate::io::IOPort;
use crate::locking::SpinLock;
use crate::mem::PhysMemory;
use crate::pci::cf8::{PCI_CONFIG_ADDRESS_PORT, PCI_CONFIG_DATA_PORT};
use crate::pci::indirect::SMN_INDEX;
use crate::pci::{ConfigWidth, PciAddress, PciConfigSpace};
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

const SMN_DATA: PciAddress = SMN_INDEX.offset(4);

#[derive(Debug, Default)]
struct ConfigState {
    functions: BTreeMap<(u8, u8, u8), Vec<u8>>,
    bar_masks: BTreeMap<PciAddress, u32>,
    smn: BTreeMap<u32, u32>,
    writes: Vec<(PciAddress, ConfigWidth, u32)>,
}

impl ConfigState {
    fn key(addr: PciAddress) -> (u8, u8, u8) {
        (addr.bus(), addr.device(), addr.function())
    }

    fn load(&self, addr: PciAddress, width: ConfigWidth) -> u32 {
        let Some(space) = self.functions.get(&Self::key(addr)) else {
            return u32::MAX >> (32 - width.bits());
        };
        if addr == SMN_DATA && width == ConfigWidth::Dword {
            let index = self.load(SMN_INDEX, ConfigWidth::Dword);
            return self.smn.get(&index).copied().unwrap_or(0);
        }
        let start = usize::from(addr.register());
        space[start..start + usize::from(width.bytes())]
            .iter()
            .rev()
            .fold(0u32, |acc, b| acc << 8 | u32::from(*b))
    }

    fn store(&mut self, addr: PciAddress, width: ConfigWidth, val: u32) {
        self.writes.push((addr, width, val));
        if !self.functions.contains_key(&Self::key(addr)) {
            return;
        }
        if addr == SMN_DATA && width == ConfigWidth::Dword {
            let index = self.load(SMN_INDEX, ConfigWidth::Dword);
            self.smn.insert(index, val);
            return;
        }
        let val = match self.bar_masks.get(&addr) {
            Some(mask) if width == ConfigWidth::Dword => val & !mask,
            _ => val,
        };
        let start = usize::from(addr.register());
        if let Some(space) = self.functions.get_mut(&Self::key(addr)) {
            for (i, b) in space[start..start + usize::from(width.bytes())]
                .iter_mut()
                .enumerate()
            {
                *b = (val >> (8 * i)) as u8;
            }
        }
    }
}

/// In-memory configuration space. Functions that were not added read as
/// all ones. Dword accesses to 0:0.0 register 0xBC are routed to an SMN
/// register map indexed by register 0xB8.
#[derive(Debug, Default)]
pub struct FakeConfigSpace {
    state: SpinLock<ConfigState>,
}

impl FakeConfigSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&self, bus: u8, device: u8, function: u8) {
        self.state
            .lock()
            .functions
            .insert((bus, device, function), vec![0u8; 0x1000]);
    }

    /// Makes the dword register at `bar` behave like a memory BAR of `size`
    /// bytes: low address bits read back as zero. A size of zero models an
    /// unimplemented BAR.
    pub fn set_bar_size(&self, bar: PciAddress, size: u32) {
        self.state
            .lock()
            .bar_masks
            .insert(bar, size.wrapping_sub(1));
    }

    pub fn set_smn(&self, smn_addr: u32, val: u32) {
        self.state.lock().smn.insert(smn_addr, val);
    }

    pub fn smn(&self, smn_addr: u32) -> Option<u32> {
        self.state.lock().smn.get(&smn_addr).copied()
    }

    /// All writes issued so far, including those to absent functions.
    pub fn writes(&self) -> Vec<(PciAddress, ConfigWidth, u32)> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl PciConfigSpace for FakeConfigSpace {
    fn read8(&self, addr: PciAddress) -> Result<u8, FwError> {
        Ok(self.state.lock().load(addr, ConfigWidth::Byte) as u8)
    }

    fn read16(&self, addr: PciAddress) -> Result<u16, FwError> {
        Ok(self.state.lock().load(addr, ConfigWidth::Word) as u16)
    }

    fn read32(&self, addr: PciAddress) -> Result<u32, FwError> {
        Ok(self.state.lock().load(addr, ConfigWidth::Dword))
    }

    fn write8(&self, addr: PciAddress, val: u8) -> Result<(), FwError> {
        self.state
            .lock()
            .store(addr, ConfigWidth::Byte, u32::from(val));
        Ok(())
    }

    fn write16(&self, addr: PciAddress, val: u16) -> Result<(), FwError> {
        self.state
            .lock()
            .store(addr, ConfigWidth::Word, u32::from(val));
        Ok(())
    }

    fn write32(&self, addr: PciAddress, val: u32) -> Result<(), FwError> {
        self.state.lock().store(addr, ConfigWidth::Dword, val);
        Ok(())
    }
}

/// Port I/O fake implementing the CF8/CFC mechanism on top of a
/// [`FakeConfigSpace`].
#[derive(Debug)]
pub struct FakeIo {
    cfg: FakeConfigSpace,
    latch: SpinLock<u32>,
}

impl FakeIo {
    pub fn new(cfg: FakeConfigSpace) -> Self {
        Self {
            cfg,
            latch: SpinLock::new(0),
        }
    }

    pub fn config(&self) -> &FakeConfigSpace {
        &self.cfg
    }

    pub fn last_address(&self) -> u32 {
        *self.latch.lock()
    }

    fn target(&self, port: u16) -> Option<PciAddress> {
        let latch = *self.latch.lock();
        if latch & 0x8000_0000 == 0 || !(PCI_CONFIG_DATA_PORT..PCI_CONFIG_DATA_PORT + 4).contains(&port) {
            return None;
        }
        Some(PciAddress::from_bdf_register(latch & 0x00ff_fffc).offset(port - PCI_CONFIG_DATA_PORT))
    }
}

impl IOPort for FakeIo {
    fn outb(&self, port: u16, value: u8) {
        if let Some(addr) = self.target(port) {
            let _ = self.cfg.write8(addr, value);
        }
    }

    fn inb(&self, port: u16) -> u8 {
        self.target(port)
            .and_then(|addr| self.cfg.read8(addr).ok())
            .unwrap_or(0xff)
    }

    fn outw(&self, port: u16, value: u16) {
        if let Some(addr) = self.target(port) {
            let _ = self.cfg.write16(addr, value);
        }
    }

    fn inw(&self, port: u16) -> u16 {
        self.target(port)
            .and_then(|addr| self.cfg.read16(addr).ok())
            .unwrap_or(0xffff)
    }

    fn outl(&self, port: u16, value: u32) {
        if port == PCI_CONFIG_ADDRESS_PORT {
            *self.latch.lock() = value;
        } else if let Some(addr) = self.target(port) {
            let _ = self.cfg.write32(addr, value);
        }
    }

    fn inl(&self, port: u16) -> u32 {
        self.target(port)
            .and_then(|addr| self.cfg.read32(addr).ok())
            .unwrap_or(0xffff_ffff)
    }
}

/// Sparse physical memory made of byte regions. Accesses outside every
/// region fail with [`FwError::InvalidAddress`].
#[derive(Debug, Default)]
pub struct FakeMemory {
    regions: SpinLock<BTreeMap<u64, Vec<u8>>>,
}

impl FakeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_region(&self, base: u64, data: &[u8]) {
        self.regions.lock().insert(base, data.to_vec());
    }

    fn with_slice<R>(
        &self,
        addr: u64,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, FwError> {
        let mut regions = self.regions.lock();
        let (base, data) = regions
            .range_mut(..=addr)
            .next_back()
            .ok_or(FwError::InvalidAddress(addr))?;
        let start = usize::try_from(addr - *base).map_err(|_| FwError::InvalidAddress(addr))?;
        if start + len > data.len() {
            return Err(FwError::InvalidAddress(addr));
        }
        Ok(f(&mut data[start..start + len]))
    }

    fn load(&self, addr: u64, len: usize) -> Result<u32, FwError> {
        self.with_slice(addr, len, |s| {
            s.iter().rev().fold(0u32, |acc, b| acc << 8 | u32::from(*b))
        })
    }

    fn store(&self, addr: u64, len: usize, val: u32) -> Result<(), FwError> {
        self.with_slice(addr, len, |s| {
            for (i, b) in s.iter_mut().enumerate() {
                *b = (val >> (8 * i)) as u8;
            }
        })
    }
}

impl PhysMemory for FakeMemory {
    fn read_u8(&self, addr: u64) -> Result<u8, FwError> {
        self.load(addr, 1).map(|v| v as u8)
    }

    fn read_u16(&self, addr: u64) -> Result<u16, FwError> {
        self.load(addr, 2).map(|v| v as u16)
    }

    fn read_u32(&self, addr: u64) -> Result<u32, FwError> {
        self.load(addr, 4)
    }

    fn write_u8(&self, addr: u64, val: u8) -> Result<(), FwError> {
        self.store(addr, 1, u32::from(val))
    }

    fn write_u16(&self, addr: u64, val: u16) -> Result<(), FwError> {
        self.store(addr, 2, u32::from(val))
    }

    fn write_u32(&self, addr: u64, val: u32) -> Result<(), FwError> {
        self.store(addr, 4, val)
    }
}
