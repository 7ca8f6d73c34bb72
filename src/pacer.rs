//! The optional `Pacer` collaborator (spec §5).
//!
//! A single non-blocking hook invoked at bounded iteration counts inside the
//! long-running loops (record decode, interpolation, signed-int repair,
//! stop-point scan) so an embedding host can extend a work-lease on a shared
//! lock. Not a scheduler: the core never awaits it and never retries on its
//! behalf.

/// What the pacer hook reports back each time it fires.
#[derive(Debug, Clone, Copy)]
pub enum PacerSignal {
    /// Keep going, no new deadline information.
    Continue,
    /// Keep going; the host extended the lease to this monotonic deadline.
    ExtendedTo(std::time::Instant),
}

/// Invoked every `interval` iterations of a long loop. `None` disables
/// pacing entirely (the default).
pub struct Pacer {
    hook: Option<Box<dyn FnMut() -> PacerSignal + Send>>,
    interval: usize,
    count: usize,
}

impl Pacer {
    pub fn new(interval: usize, hook: Box<dyn FnMut() -> PacerSignal + Send>) -> Self {
        Pacer {
            hook: Some(hook),
            interval: interval.max(1),
            count: 0,
        }
    }

    pub fn disabled() -> Self {
        Pacer {
            hook: None,
            interval: 1,
            count: 0,
        }
    }

    /// Call on every loop iteration; fires the hook at most once per
    /// `interval` calls.
    pub fn tick(&mut self) {
        let Some(hook) = self.hook.as_mut() else {
            return;
        };
        self.count += 1;
        if self.count >= self.interval {
            self.count = 0;
            let _ = hook();
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Pacer::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fires_every_interval_ticks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let mut pacer = Pacer::new(
            3,
            Box::new(move || {
                calls2.fetch_add(1, Ordering::SeqCst);
                PacerSignal::Continue
            }),
        );
        for _ in 0..10 {
            pacer.tick();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn disabled_pacer_never_fires() {
        let mut pacer = Pacer::disabled();
        for _ in 0..100 {
            pacer.tick();
        }
    }
}
