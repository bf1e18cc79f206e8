//! Message keys derived from the wall clock.

/// Generates unix-millisecond timestamp keys that strictly increase, even when
/// several keys are drawn within the same millisecond or the clock steps back.
#[derive(Debug, Default)]
pub struct TimestampKeys {
    last: i64,
}

impl TimestampKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&mut self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last.to_string()
    }
}

impl Iterator for TimestampKeys {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_key())
    }
}
