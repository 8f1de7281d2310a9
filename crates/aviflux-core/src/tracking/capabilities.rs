// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Host capabilities the engine needs but does not own.

use chrono::{DateTime, Utc};

/// Wall-clock source for ETAs. Timer scheduling uses the Tokio clock instead.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A short audible notification played while tracking with sound enabled.
/// Called with the engine lock held, so it must return quickly.
pub trait AudioCue: Send + Sync {
    fn play(&self);
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCue;

impl AudioCue for SilentCue {
    fn play(&self) {}
}
