//! Controller tuning knobs, injected explicitly rather than read from any
//! ambient global.

use std::ops::RangeInclusive;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Items requested per fetch.
    pub page_size: usize,
    /// Pages merged per filtered-search round before the filter runs.
    pub batch_pages: u32,
    /// Hard cap on auto-retries when a filtered round matches nothing but
    /// more pages exist.
    pub max_filter_retries: u32,
    /// Quiet period after the last query-text change before a search fires.
    pub query_debounce: Duration,
    /// Randomized delay between filtered-search retry rounds, milliseconds.
    pub retry_jitter_ms: RangeInclusive<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            batch_pages: 3,
            max_filter_retries: 3,
            query_debounce: Duration::from_millis(250),
            retry_jitter_ms: 40..=120,
        }
    }
}
