// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use super::{Psp, PspError};
use crate::error::FwError;

pub const PSP_PCI_DEVID_REG: u16 = 0x00;
pub const PSP_PCI_CMD_REG: u16 = 0x04;
pub const PSP_PCI_BAR1_REG: u16 = 0x18;
pub const PSP_PCI_BAR3_REG: u16 = 0x20;
pub const PSP_PCI_MIRRORCTRL1_REG: u16 = 0x44;
pub const PSP_PCI_EXTRAPCIHDR_REG: u16 = 0x48;

/// Capability next pointer field of MIRRORCTRL1
pub const D8F0X44_PM_NXT_PTR_W_MASK: u32 = 0xff;

/// Northbridge MMIO base/limit pair used to route the temporary BAR1.
const NB_MMIO_BASE_REG: u16 = 0xb8;
const NB_MMIO_LIMIT_REG: u16 = 0xbc;

const CMD_MEMORY_SPACE: u32 = 1 << 1;
const CMD_BUS_MASTER: u32 = 1 << 2;

/// MSI-X, BAR1 and BAR3 enable in EXTRAPCIHDR
const EXTRAPCIHDR_ENABLES: u32 = 0x34;
const MIRRORCTRL1_PM_NXT_PTR: u32 = 0xa4;

impl Psp<'_> {
    /// Assigns a temporary BAR1 to the PSP so the mailbox is reachable
    /// before PCI enumeration. Returns `false` when the PCI function is
    /// absent. An already assigned BAR1 is left alone.
    pub fn bar_init_early(&self) -> Result<bool, FwError> {
        if self.read_psp_config(PSP_PCI_DEVID_REG)? == u32::MAX {
            log::info!("PSP PCI function not present");
            return Ok(false);
        }
        if self.read_psp_config(PSP_PCI_BAR1_REG)? != 0 {
            return Ok(true);
        }

        self.write_psp_config(PSP_PCI_BAR1_REG, u32::MAX)?;
        let size = (!self.read_psp_config(PSP_PCI_BAR1_REG)?).wrapping_add(1);
        let base = self.config.bar1_temp_base;
        let limit = size
            .checked_sub(1)
            .and_then(|s| base.checked_add(s))
            .ok_or(PspError::BarSizing)?;
        log::info!("PSP BAR1: assigning temporary window {base:#x}-{limit:#x}");

        self.write_psp_config(PSP_PCI_BAR1_REG, base)?;
        self.write_psp_config(PSP_PCI_CMD_REG, CMD_MEMORY_SPACE | CMD_BUS_MASTER)?;

        let nb = self.config.nb_mmio_function;
        self.pci_write_config(
            nb.with_register(NB_MMIO_LIMIT_REG).bdf_register(),
            (limit >> 8) & !0xff,
        )?;
        self.pci_write_config(
            nb.with_register(NB_MMIO_BASE_REG).bdf_register(),
            (base >> 8) | 3,
        )?;

        self.write_psp_config(PSP_PCI_EXTRAPCIHDR_REG, EXTRAPCIHDR_ENABLES)?;
        let mirror = self.read_psp_config(PSP_PCI_MIRRORCTRL1_REG)?;
        self.write_psp_config(
            PSP_PCI_MIRRORCTRL1_REG,
            (mirror & !D8F0X44_PM_NXT_PTR_W_MASK) | MIRRORCTRL1_PM_NXT_PTR,
        )?;
        Ok(true)
    }

    fn bar_addr(&self, reg: u16) -> Result<u32, FwError> {
        if !self.device_present()? {
            return Err(PspError::DeviceNotPresent.into());
        }
        match self.read_psp_config(reg)? {
            u32::MAX => Err(PspError::BarUnassigned(reg).into()),
            addr => Ok(addr),
        }
    }

    /// Raw BAR1 value, the PSP MMIO window holding the mailbox.
    pub fn bar1_addr(&self) -> Result<u32, FwError> {
        self.bar_addr(PSP_PCI_BAR1_REG)
    }

    pub fn bar3_addr(&self) -> Result<u32, FwError> {
        self.bar_addr(PSP_PCI_BAR3_REG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PspConfig;
    use crate::pci::{ConfigWidth, PciAddress, PciConfigSpace};
    use crate::psp::fuses::SMU_CC_PSP_FUSES_STATUS;
    use crate::testutils::{FakeConfigSpace, FakeMemory};

    const PSP: PciAddress = PciAddress::new(0, 8, 0, 0);
    const NB: PciAddress = PciAddress::new(0, 0x18, 1, 0);

    fn platform() -> FakeConfigSpace {
        let cfg = FakeConfigSpace::new();
        cfg.add_function(0, 0, 0);
        cfg.add_function(0, 8, 0);
        cfg.add_function(0, 0x18, 1);
        cfg.write32(PSP, 0x1537_1022).unwrap();
        cfg.set_bar_size(PSP.with_register(PSP_PCI_BAR1_REG), 0x10_0000);
        cfg.write32(PSP.with_register(PSP_PCI_MIRRORCTRL1_REG), 0x1234_5600)
            .unwrap();
        cfg.set_smn(SMU_CC_PSP_FUSES_STATUS, 0x4);
        cfg.clear_writes();
        cfg
    }

    #[test]
    fn absent_function() {
        let cfg = FakeConfigSpace::new();
        let mem = FakeMemory::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());
        assert_eq!(psp.bar_init_early(), Ok(false));
        assert!(cfg.writes().is_empty());
    }

    #[test]
    fn assigns_temporary_bar() {
        let cfg = platform();
        let mem = FakeMemory::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());
        assert_eq!(psp.bar_init_early(), Ok(true));

        let dword = |reg: u16, val: u32| (PSP.with_register(reg), ConfigWidth::Dword, val);
        assert_eq!(
            cfg.writes(),
            [
                dword(PSP_PCI_BAR1_REG, 0xffff_ffff),
                dword(PSP_PCI_BAR1_REG, 0xfea0_0000),
                dword(PSP_PCI_CMD_REG, 0x6),
                (NB.with_register(0xbc), ConfigWidth::Dword, 0x00fe_af00),
                (NB.with_register(0xb8), ConfigWidth::Dword, 0x00fe_a003),
                dword(PSP_PCI_EXTRAPCIHDR_REG, 0x34),
                dword(PSP_PCI_MIRRORCTRL1_REG, 0x1234_56a4),
            ]
        );
        assert_eq!(psp.bar1_addr(), Ok(0xfea0_0000));
    }

    #[test]
    fn assigned_bar_is_kept() {
        let cfg = platform();
        cfg.write32(PSP.with_register(PSP_PCI_BAR1_REG), 0xd000_0000)
            .unwrap();
        cfg.clear_writes();
        let mem = FakeMemory::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());
        assert_eq!(psp.bar_init_early(), Ok(true));
        assert!(cfg.writes().is_empty());
        assert_eq!(psp.bar1_addr(), Ok(0xd000_0000));
    }

    #[test]
    fn unsized_bar() {
        let cfg = platform();
        cfg.set_bar_size(PSP.with_register(PSP_PCI_BAR1_REG), 0);
        let mem = FakeMemory::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());
        assert_eq!(psp.bar_init_early(), Err(FwError::Psp(PspError::BarSizing)));
    }

    #[test]
    fn bar_addr_requires_fused_device() {
        let cfg = platform();
        cfg.set_smn(SMU_CC_PSP_FUSES_STATUS, 0);
        let mem = FakeMemory::new();
        let psp = Psp::new(&cfg, &mem, PspConfig::default());
        assert_eq!(
            psp.bar3_addr(),
            Err(FwError::Psp(PspError::DeviceNotPresent))
        );

        cfg.set_smn(SMU_CC_PSP_FUSES_STATUS, 0x4);
        cfg.write32(PSP.with_register(PSP_PCI_BAR3_REG), u32::MAX)
            .unwrap();
        assert_eq!(
            psp.bar3_addr(),
            Err(FwError::Psp(PspError::BarUnassigned(PSP_PCI_BAR3_REG)))
        );
    }
}
