use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;

/// Decides when a view that became visible again should revalidate.
///
/// Revalidation happens on a hidden -> visible transition, at most once per
/// `min_interval`, so quick tab switching does not refetch everything.
pub struct FocusRevalidator {
    min_interval: Duration,
    visible: AtomicBool,
    last_revalidation: Mutex<Instant>,
}

impl FocusRevalidator {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            visible: AtomicBool::new(true),
            last_revalidation: Mutex::new(Instant::now()),
        }
    }

    pub fn on_visibility_change(&self, visible: bool) -> bool {
        let was_visible = self.visible.swap(visible, Ordering::AcqRel);
        if !visible || was_visible {
            return false;
        }

        let mut last = self
            .last_revalidation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last.elapsed() <= self.min_interval {
            return false;
        }
        *last = Instant::now();
        true
    }
}
