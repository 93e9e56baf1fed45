use std::time::Instant;

/// Logs how long a pipeline stage took when it goes out of scope.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        log::debug!("{} started", name);
        Self {
            name,
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::info!("{} took {:.2} ms", self.name, self.elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_is_monotonic() {
        let timer = ScopedTimer::new("test stage");
        let first = timer.elapsed_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(timer.elapsed_ms() >= first + 1.0);
    }
}
