//! Device capability seams: screen orientation and the screen wake lock.
//!
//! Both are side effects on the platform, not engine state. Failures are
//! logged and otherwise ignored so the timer keeps working.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::DeviceError;
use crate::events::Event;

pub trait OrientationLock {
    /// Allow free rotation.
    fn unlock(&mut self) -> Result<(), DeviceError>;
    /// Pin the screen back to portrait.
    fn lock_portrait(&mut self) -> Result<(), DeviceError>;
}

pub trait WakeLockBackend {
    fn acquire(&mut self) -> Result<(), DeviceError>;
    fn release(&mut self) -> Result<(), DeviceError>;
}

/// Headless stand-in for both capabilities.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDevice;

impl OrientationLock for NoopDevice {
    fn unlock(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn lock_portrait(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

impl WakeLockBackend for NoopDevice {
    fn acquire(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

impl<T: OrientationLock + ?Sized> OrientationLock for Box<T> {
    fn unlock(&mut self) -> Result<(), DeviceError> {
        (**self).unlock()
    }

    fn lock_portrait(&mut self) -> Result<(), DeviceError> {
        (**self).lock_portrait()
    }
}

impl<T: WakeLockBackend + ?Sized> WakeLockBackend for Box<T> {
    fn acquire(&mut self) -> Result<(), DeviceError> {
        (**self).acquire()
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        (**self).release()
    }
}

/// Unlock orientation, logging instead of failing.
pub fn unlock_orientation<O: OrientationLock + ?Sized>(orientation: &mut O) {
    if let Err(e) = orientation.unlock() {
        warn!(error = %e, "orientation unlock skipped");
    }
}

/// Restore portrait, logging instead of failing.
pub fn restore_portrait<O: OrientationLock + ?Sized>(orientation: &mut O) {
    if let Err(e) = orientation.lock_portrait() {
        warn!(error = %e, "orientation lock skipped");
    }
}

/// Reference-counted screen wake lock.
///
/// Owners (one per timer screen) report whether they are running; the
/// backend is acquired when the first owner starts and released when the
/// last one stops. Reporting the same state twice is harmless.
#[derive(Debug)]
pub struct WakeLock<B: WakeLockBackend> {
    backend: B,
    holders: BTreeSet<String>,
    held: bool,
    enabled: bool,
}

impl<B: WakeLockBackend> WakeLock<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            holders: BTreeSet::new(),
            held: false,
            enabled: true,
        }
    }

    /// A wake lock that tracks owners but never touches the backend.
    pub fn disabled(backend: B) -> Self {
        Self {
            enabled: false,
            ..Self::new(backend)
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn holders(&self) -> impl Iterator<Item = &str> {
        self.holders.iter().map(String::as_str)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Feed an engine/session event emitted by `owner`.
    pub fn observe(&mut self, owner: &str, event: &Event) {
        match event.running_signal() {
            Some(true) => self.hold(owner),
            Some(false) => self.release(owner),
            None => {}
        }
    }

    pub fn hold(&mut self, owner: &str) {
        self.holders.insert(owner.to_string());
        self.sync();
    }

    pub fn release(&mut self, owner: &str) {
        self.holders.remove(owner);
        self.sync();
    }

    /// Drop every owner, e.g. when the app goes to the background.
    pub fn release_all(&mut self) {
        self.holders.clear();
        self.sync();
    }

    fn sync(&mut self) {
        if !self.enabled {
            return;
        }
        let want = !self.holders.is_empty();
        if want == self.held {
            return;
        }
        let result = if want {
            self.backend.acquire()
        } else {
            self.backend.release()
        };
        match result {
            Ok(()) => {
                self.held = want;
                debug!(held = want, "wake lock changed");
            }
            Err(e) => warn!(error = %e, "wake lock change skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerKind;
    use chrono::Utc;

    #[derive(Debug, Default)]
    struct Recording {
        acquires: u32,
        releases: u32,
        fail: bool,
    }

    impl WakeLockBackend for Recording {
        fn acquire(&mut self) -> Result<(), DeviceError> {
            if self.fail {
                return Err(DeviceError::Unsupported("wake lock"));
            }
            self.acquires += 1;
            Ok(())
        }

        fn release(&mut self) -> Result<(), DeviceError> {
            self.releases += 1;
            Ok(())
        }
    }

    #[test]
    fn acquires_once_for_many_owners() {
        let mut lock = WakeLock::new(Recording::default());
        lock.hold("amrap");
        lock.hold("amrap");
        lock.hold("session");
        assert_eq!(lock.backend().acquires, 1);
        lock.release("amrap");
        assert!(lock.is_held());
        lock.release("session");
        assert!(!lock.is_held());
        assert_eq!(lock.backend().releases, 1);
    }

    #[test]
    fn follows_engine_events() {
        let mut lock = WakeLock::new(Recording::default());
        let now = Utc::now();
        lock.observe(
            "emom",
            &Event::TimerStarted {
                kind: TimerKind::Emom,
                at: now,
            },
        );
        assert!(lock.is_held());
        lock.observe(
            "emom",
            &Event::RoundAdvanced {
                kind: TimerKind::Emom,
                round: 2,
                at: now,
            },
        );
        assert!(lock.is_held());
        lock.observe(
            "emom",
            &Event::TimerCompleted {
                kind: TimerKind::Emom,
                final_time: "00:10.00".into(),
                rounds: 2,
                manual: false,
                at: now,
            },
        );
        assert!(!lock.is_held());
    }

    #[test]
    fn unsupported_backend_is_not_fatal() {
        let mut lock = WakeLock::new(Recording {
            fail: true,
            ..Recording::default()
        });
        lock.hold("stopwatch");
        assert!(!lock.is_held());
        assert_eq!(lock.holders().count(), 1);
    }

    #[test]
    fn disabled_lock_never_calls_backend() {
        let mut lock = WakeLock::disabled(Recording::default());
        lock.hold("tabata");
        lock.release_all();
        assert_eq!(lock.backend().acquires, 0);
        assert_eq!(lock.backend().releases, 0);
    }
}
