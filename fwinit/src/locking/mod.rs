// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 The fwinit Authors

pub mod spinlock;

pub use spinlock::{LockGuard, SpinLock};
