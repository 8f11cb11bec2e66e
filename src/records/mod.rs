pub mod candle;
pub mod frequency;
pub mod job;

pub use candle::{Candle, Row};
pub use frequency::{interval_code_for, Frequency};
pub use job::{decode_job, Job, JobSpan, SINCE_DATE_REQUEST};
