use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Issues `<PREFIX>-<unix millis>` order numbers. Values are strictly
/// increasing: two submissions in the same millisecond get consecutive values.
#[derive(Debug)]
pub struct OrderNumberGenerator {
    prefix: String,
    last: AtomicI64,
}

impl OrderNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last: AtomicI64::new(0),
        }
    }

    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn next(&self) -> String {
        format!("{}-{}", self.prefix, self.next_millis())
    }
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new("ORD")
    }
}
