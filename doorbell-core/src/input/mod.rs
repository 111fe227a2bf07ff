//! Push-button conditioning: debounce, then rate limiting.

mod debounce;
mod rate_limit;

pub use debounce::{Activation, DebouncedInput};
pub use rate_limit::{RateDecision, RateLimiter};
