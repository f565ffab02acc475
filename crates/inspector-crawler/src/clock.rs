//! Source of "today" for the snapshot gate.

use inspector_store::DateKey;

pub trait Clock: Send + Sync {
    fn today(&self) -> DateKey;
}

/// Wall clock in the process's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> DateKey {
        DateKey::new(chrono::Local::now().date_naive())
    }
}
