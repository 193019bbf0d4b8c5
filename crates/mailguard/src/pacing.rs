//! Delays between remote calls.
//!
//! Shopify's REST Admin API allows roughly two requests per second per app.
//! Rather than reading the call-limit header the jobs pause a fixed amount
//! after every customer, whether the call succeeded or not.

use std::time::Duration;

/// Number of attempts for every remote customer call (first try included).
pub const MAX_ATTEMPTS: usize = 3;

/// Timing knobs for the suppression coordinator and billing tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Delay between retry attempts of one remote call.
    pub retry_delay: Duration,
    /// Pause after each customer in suppress and restore runs.
    pub suppression_delay: Duration,
    /// Pause after each customer in tag and untag passes.
    pub tagging_delay: Duration,
    /// How often restore checks whether a suppression run has finished.
    pub restore_poll_interval: Duration,
    /// How long restore waits for a suppression run before giving up.
    pub restore_wait_limit: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
            suppression_delay: Duration::from_millis(300),
            tagging_delay: Duration::from_millis(500),
            restore_poll_interval: Duration::from_millis(500),
            restore_wait_limit: Duration::from_secs(180),
        }
    }
}
