//! Module: db::backend
//! Responsibility: the contract a persistence engine implements to run queries.
//! Does not own: request construction or context resolution order.
//! Boundary: the only seam between the query layer and external storage.

use crate::{db::request::FetchRequest, error::BackendError, value::Dictionary};

///
/// FetchRow
///
/// One element of a fetch result, in the shape the request asked for.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FetchRow<O, I> {
    Object(O),
    ObjectId(I),
    Dictionary(Dictionary),
}

///
/// Backend
///
/// Opaque execution engine. `translate` must be deterministic and free of
/// side effects; `fetch` and `count` only read through the supplied context.
///
/// The core never mutates a context and never retries a failed call.
///

pub trait Backend {
    /// Caller-owned execution session, e.g. a store handle.
    type Context: Clone;

    /// Backend-native request produced by `translate`.
    type Request;

    type Object;
    type ObjectId;

    /// Context used when neither the call nor the query supplies one.
    fn resolve_default_context(&self) -> Option<Self::Context>;

    fn translate(
        &self,
        request: &FetchRequest,
        context: &Self::Context,
    ) -> Result<Self::Request, BackendError>;

    /// Rows in request order.
    fn fetch(
        &self,
        request: &Self::Request,
        context: &Self::Context,
    ) -> Result<Vec<FetchRow<Self::Object, Self::ObjectId>>, BackendError>;

    fn count(&self, request: &Self::Request, context: &Self::Context) -> Result<u64, BackendError>;
}
