use crate::error::Result;

pub mod auth;
pub mod decode;
pub mod history;
pub mod limiter;
pub mod request;

pub use auth::{CredentialProvider, SessionCookie, StaticCredentials};
pub use decode::{decode_history, TrimPolicy};
pub use history::{HistoryFetcher, HttpFetcher};
pub use limiter::{Clock, RateLimiter, SystemClock};
pub use request::{HistoryRequest, RequestBuilder};

pub type FetchResult<T> = Result<T>;
