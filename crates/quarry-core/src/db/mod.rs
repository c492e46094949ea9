//! Module: db
//! Responsibility: query construction, the backend contract, and the
//! session that routes execution between them.

pub mod backend;
pub mod memory;
pub mod query;
pub mod request;
pub mod session;

// re-exports
pub use backend::{Backend, FetchRow};
pub use request::{FetchRequest, RequestDescription, RequestFingerprint, ResultType};
pub use session::Session;
