// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

//! Architectural definitions for x86-64 platform bring-up code.

#![no_std]

pub mod control_regs;
pub mod msr;
pub mod mtrr;
pub mod paging;
