//! Repository for the upstream widgets API.
//!
//! A worked example of a repository layer: typed requests to one discovered
//! service, failures reported as [`UpstreamResponseError`](nmtkit_core::UpstreamResponseError).

mod repository;
mod schemas;

pub use repository::WidgetApiRepository;
pub use schemas::{WidgetCreate, WidgetRead, WidgetZap, WidgetZapTask};
