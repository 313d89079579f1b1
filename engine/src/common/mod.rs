pub mod errors;
pub mod rate_limiter;

pub use errors::{ConfigError, ProviderError, ProviderErrorKind, SweepError};
pub use rate_limiter::{DeleteRateLimiter, RateLimitError};
