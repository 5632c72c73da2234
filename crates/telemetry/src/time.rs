// Path: crates/telemetry/src/time.rs
use std::time::Instant;

/// Reports the elapsed seconds of its scope to `observe` when dropped.
pub struct Timer<F: FnOnce(f64)> {
    observe: Option<F>,
    start: Instant,
}

impl<F: FnOnce(f64)> Timer<F> {
    pub fn new(observe: F) -> Self {
        Self {
            observe: Some(observe),
            start: Instant::now(),
        }
    }
}

impl<F: FnOnce(f64)> Drop for Timer<F> {
    fn drop(&mut self) {
        if let Some(observe) = self.observe.take() {
            observe(self.start.elapsed().as_secs_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn observes_once_on_drop() {
        let seen = Cell::new(-1.0);
        {
            let _t = Timer::new(|secs| seen.set(secs));
        }
        assert!(seen.get() >= 0.0);
    }
}
