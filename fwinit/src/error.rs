// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

use crate::pci::PciError;
use crate::psp::PspError;
use crate::s3::S3Error;
use core::fmt;

// As a general rule, functions private to a given module may use the
// leaf error types. Public functions should return an FwError
// containing a leaf error type, usually the one corresponding to
// that module. We always provide a way to convert a leaf error into
// a FwError via the From trait at the module level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FwError {
    // Errors related to PCI configuration space access
    Pci(PciError),
    // Errors related to the S3 boot script
    S3(S3Error),
    // Errors from the PSP base library
    Psp(PspError),
    // Physical address not backed by memory or misaligned
    InvalidAddress(u64),
}

impl fmt::Display for FwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pci(e) => write!(f, "PCI error: {e}"),
            Self::S3(e) => write!(f, "S3 boot script error: {e}"),
            Self::Psp(e) => write!(f, "PSP error: {e}"),
            Self::InvalidAddress(addr) => write!(f, "invalid physical address {addr:#x}"),
        }
    }
}

impl core::error::Error for FwError {}
