//! Tower layers shared by nmtkit services.
//!
//! - [`RequestIdLayer`]: assigns each request a short correlation ID, scoped
//!   for logging and echoed in `x-request-id`
//! - [`RequestDurationLayer`]: logs each request's duration and reports it in
//!   `x-process-time-milliseconds`
//!
//! Put `RequestIdLayer` outermost so the duration log line carries the ID.

mod request_duration;
mod request_id;

pub use request_duration::{PROCESS_TIME_HEADER, RequestDurationLayer, RequestDurationService};
pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer, RequestIdService};
