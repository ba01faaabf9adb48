// In-memory rate limiter for the expensive or spammable endpoints.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Different rate limit types with their constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitType {
    /// Candidate searches (each one runs the scorer and writes match rows).
    MatchSearches,
    /// Chat messages sent to match partners.
    MessagesSent,
}

impl RateLimitType {
    /// Maximum number of events allowed in the window.
    pub fn max_count(&self) -> usize {
        match self {
            RateLimitType::MatchSearches => 60,
            RateLimitType::MessagesSent => 300,
        }
    }

    /// Time window for the rate limit.
    pub fn window(&self) -> Duration {
        match self {
            RateLimitType::MatchSearches => Duration::from_secs(3600),
            RateLimitType::MessagesSent => Duration::from_secs(3600),
        }
    }
}

impl std::fmt::Display for RateLimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitType::MatchSearches => write!(f, "match searches per hour"),
            RateLimitType::MessagesSent => write!(f, "messages per hour"),
        }
    }
}

/// Error returned when a rate limit is exceeded.
#[derive(Debug, Clone)]
pub struct RateLimitError {
    pub limit_type: RateLimitType,
    pub max: usize,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rate limit exceeded: max {} {}",
            self.max, self.limit_type
        )
    }
}

impl std::error::Error for RateLimitError {}

/// Key for the rate limit map: (user_id, limit_type).
type LimitKey = (i64, RateLimitType);

/// Map size at which idle keys are swept before inserting.
const SWEEP_THRESHOLD: usize = 1024;

/// Drop expired events and the keys left with none.
fn sweep(map: &mut HashMap<LimitKey, Vec<Instant>>, now: Instant) {
    map.retain(|(_, limit_type), entries| {
        let window = limit_type.window();
        entries.retain(|t| now.duration_since(*t) < window);
        !entries.is_empty()
    });
}

/// Thread-safe sliding-window rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<LimitKey, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if the user is within the rate limit for the given type.
    /// If within limits, records the event and returns Ok(()).
    pub fn check_limit(
        &self,
        user_id: i64,
        limit_type: RateLimitType,
    ) -> Result<(), RateLimitError> {
        let mut map = self.inner.lock().unwrap();
        let window = limit_type.window();
        let max = limit_type.max_count();
        let now = Instant::now();

        if map.len() >= SWEEP_THRESHOLD {
            sweep(&mut map, now);
        }

        let entries = map.entry((user_id, limit_type)).or_default();

        // Drop events that fell out of the window
        entries.retain(|t| now.duration_since(*t) < window);

        if entries.len() >= max {
            return Err(RateLimitError { limit_type, max });
        }

        entries.push(now);
        Ok(())
    }

    /// Current count for a user and limit type (diagnostics and tests).
    pub fn current_count(&self, user_id: i64, limit_type: RateLimitType) -> usize {
        let mut map = self.inner.lock().unwrap();
        let window = limit_type.window();
        let now = Instant::now();

        let key = (user_id, limit_type);
        let count = match map.get_mut(&key) {
            Some(entries) => {
                entries.retain(|t| now.duration_since(*t) < window);
                entries.len()
            }
            None => return 0,
        };
        if count == 0 {
            map.remove(&key);
        }
        count
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
