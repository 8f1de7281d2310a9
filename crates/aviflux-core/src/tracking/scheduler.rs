// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use tokio::task::AbortHandle;

/// The three periodic tasks of one tracking session.
///
/// Replacing a slot aborts whatever task held it before, so a session can
/// never own two timers of the same class.
#[derive(Debug, Default)]
pub struct SessionTimers {
    poll: Option<AbortHandle>,
    audio: Option<AbortHandle>,
    cycle: Option<AbortHandle>,
}

fn replace(slot: &mut Option<AbortHandle>, handle: Option<AbortHandle>) {
    if let Some(old) = slot.take() {
        old.abort();
    }
    *slot = handle;
}

impl SessionTimers {
    pub fn set_poll(&mut self, handle: AbortHandle) {
        replace(&mut self.poll, Some(handle));
    }

    pub fn set_audio(&mut self, handle: AbortHandle) {
        replace(&mut self.audio, Some(handle));
    }

    pub fn set_cycle(&mut self, handle: AbortHandle) {
        replace(&mut self.cycle, Some(handle));
    }

    pub fn cancel_audio(&mut self) {
        replace(&mut self.audio, None);
    }

    pub fn cancel_cycle(&mut self) {
        replace(&mut self.cycle, None);
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn cancel_all(&mut self) {
        replace(&mut self.poll, None);
        replace(&mut self.audio, None);
        replace(&mut self.cycle, None);
    }

    /// Timers currently owned by the session.
    pub fn active_count(&self) -> usize {
        [&self.poll, &self.audio, &self.cycle]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_replacing_a_slot_aborts_the_old_task() {
        let mut timers = SessionTimers::default();
        let first = tokio::spawn(tokio::time::sleep(Duration::from_secs(3600)));
        timers.set_poll(first.abort_handle());
        let second = tokio::spawn(tokio::time::sleep(Duration::from_secs(3600)));
        timers.set_poll(second.abort_handle());

        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(timers.active_count(), 1);

        timers.cancel_all();
        assert!(second.await.unwrap_err().is_cancelled());
        assert_eq!(timers.active_count(), 0);
    }
}
