//! Procurement requests
//!
//! Requests live in an in-memory map and receive ids from a shared counter.
//! The estimation endpoint reads them by id and records the recommended
//! estimate back onto them.

pub mod handlers;
pub mod models;
pub mod store;

pub use handlers::{create_request, get_request, list_requests, RequestsState};
pub use models::{CreateRequest, EstimateSummary, ProcurementRequest, RequestStatus};
pub use store::RequestStore;
