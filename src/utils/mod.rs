pub mod logging;
pub mod math;
pub mod numeric;
pub mod rate_limiter;
pub mod time;

pub use logging::init_logging;
pub use rate_limiter::RateLimiter;
