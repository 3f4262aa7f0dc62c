use std::borrow::Cow;
use std::time::{Duration, Instant};

use tracing::info;

/// Logs `"<operation>: <n> ms"` when dropped.
#[must_use = "the timer reports when it goes out of scope"]
#[derive(Debug)]
pub struct ScopedTimer {
    operation: Cow<'static, str>,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(operation: impl Into<Cow<'static, str>>) -> Self {
        Self {
            operation: operation.into(),
            start: Instant::now(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        info!("{}: {} ms", self.operation, self.start.elapsed().as_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_scope() {
        let timer = ScopedTimer::new("sleep");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
        assert_eq!(timer.operation(), "sleep");
    }

    #[test]
    fn accepts_owned_names() {
        let name = format!("query {}", 7);
        let timer = ScopedTimer::new(name);
        assert_eq!(timer.operation(), "query 7");
    }
}
