//! Request outcome tracking.

use std::collections::VecDeque;

use super::RequestStats;

/// Whether a status code counts as a successful request (`200..400`).
#[must_use]
pub const fn is_success(status_code: u16) -> bool {
    status_code >= 200 && status_code < 400
}

/// Request outcome counters and a rolling window of response times.
///
/// The tracker has no error conditions: elapsed times that are negative or
/// not finite are recorded as zero.
#[derive(Debug, Clone)]
pub struct RequestTracker {
    total: u64,
    successful: u64,
    failed: u64,
    window: VecDeque<f64>,
    window_size: usize,
}

impl RequestTracker {
    /// Create a tracker keeping at most `window_size` response times.
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            window: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Record one completed request.
    pub fn record(&mut self, elapsed_ms: f64, status_code: u16) {
        self.total += 1;
        if is_success(status_code) {
            self.successful += 1;
        } else {
            self.failed += 1;
        }

        let elapsed_ms = if elapsed_ms.is_finite() {
            elapsed_ms.max(0.0)
        } else {
            0.0
        };

        if self.window.len() >= self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(elapsed_ms);
    }

    /// Mean response time over the window; zero when empty.
    ///
    /// Summed from the retained samples on every call.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_response_time_ms(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    /// Current counters.
    #[must_use]
    pub fn snapshot(&self) -> RequestStats {
        RequestStats {
            total: self.total,
            successful: self.successful,
            failed: self.failed,
            avg_response_time_ms: self.average_response_time_ms(),
        }
    }

    /// Number of samples currently in the window.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Reset all counters and samples.
    pub fn reset(&mut self) {
        self.total = 0;
        self.successful = 0;
        self.failed = 0;
        self.window.clear();
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(super::DEFAULT_RESPONSE_WINDOW)
    }
}
