// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

//! Early platform-initialization support: PCI configuration access, S3
//! resume boot-script recording and the PSP base library used to locate
//! the Platform Security Processor directory and mailbox.

#![no_std]

// Only referenced from `#[cfg(test)]` modules via the crate-root extern prelude.
#[allow(unused_extern_crates)]
extern crate alloc;

pub mod config;
pub mod error;
pub mod io;
pub mod locking;
pub mod mem;
pub mod pci;
pub mod psp;
pub mod s3;

// Hardware fakes for unit tests.
#[cfg(test)]
pub mod testutils;
