pub mod rate_limiter;

pub use rate_limiter::token_bucket::{rate_limit_middleware, ClientRateLimiter, RateLimitError};
