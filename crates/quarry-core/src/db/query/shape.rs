use crate::{
    db::{backend::FetchRow, request::ResultType},
    value::Dictionary,
};

mod private {
    pub trait Sealed {}
}

///
/// ResultShape
///
/// Type-level tag for the element shape a query yields.
/// Each tag fixes the request's result type and how a backend row is
/// unwrapped into the caller-facing element.
///

pub trait ResultShape: private::Sealed + 'static {
    const RESULT_TYPE: ResultType;

    type Output<O, I>;

    /// Unwrap a backend row, or `None` if the backend answered in another shape.
    fn extract<O, I>(row: FetchRow<O, I>) -> Option<Self::Output<O, I>>;
}

///
/// Objects
///
/// Full entity objects. The default shape.
///

#[derive(Debug)]
pub enum Objects {}

///
/// Ids
///
/// Backend object identifiers only.
///

#[derive(Debug)]
pub enum Ids {}

///
/// Dictionaries
///
/// Column-name → value rows; reached through projection, grouping, or distinct.
///

#[derive(Debug)]
pub enum Dictionaries {}

impl private::Sealed for Objects {}
impl private::Sealed for Ids {}
impl private::Sealed for Dictionaries {}

impl ResultShape for Objects {
    const RESULT_TYPE: ResultType = ResultType::Object;

    type Output<O, I> = O;

    fn extract<O, I>(row: FetchRow<O, I>) -> Option<O> {
        match row {
            FetchRow::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl ResultShape for Ids {
    const RESULT_TYPE: ResultType = ResultType::ObjectId;

    type Output<O, I> = I;

    fn extract<O, I>(row: FetchRow<O, I>) -> Option<I> {
        match row {
            FetchRow::ObjectId(id) => Some(id),
            _ => None,
        }
    }
}

impl ResultShape for Dictionaries {
    const RESULT_TYPE: ResultType = ResultType::Dictionary;

    type Output<O, I> = Dictionary;

    fn extract<O, I>(row: FetchRow<O, I>) -> Option<Dictionary> {
        match row {
            FetchRow::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        }
    }
}
