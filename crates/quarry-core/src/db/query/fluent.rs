//! Module: query::fluent
//! Responsibility: session-bound, shape-typed query chain and execution terminals.
//! Does not own: builder state rules (see `builder`) or backend behavior.
//! Boundary: the user-facing API; every chain method delegates to `QueryBuilder`.

use crate::{
    db::{
        backend::Backend,
        query::{
            builder::QueryBuilder,
            predicate::Predicate,
            shape::{Dictionaries, Ids, Objects, ResultShape},
        },
        request::{
            FetchRequest, PropertyConvertible, RequestDescription, RequestFingerprint,
            ResultType, SortDescriptorConvertible,
        },
        session::Session,
    },
    error::QueryError,
    traits::{Entity, FieldValue},
    value::Value,
};
use std::{fmt, marker::PhantomData};

/// One result element of a query with shape `R` over backend `B`.
pub type Row<R, B> = <R as ResultShape>::Output<<B as Backend>::Object, <B as Backend>::ObjectId>;

///
/// Query
///
/// Session-bound query over entity `E`, typed by its result shape `R`.
///
/// Chain methods available on every shape keep `R`; `select`, `group_by`,
/// and `distinct` move to `Dictionaries`; `objects` and `ids` reset to their
/// shape and drop any projection. Column helpers (`array`, `value`) exist only
/// on dictionary queries.
///

pub struct Query<'a, E, B, R = Objects>
where
    E: Entity,
    B: Backend,
    R: ResultShape,
{
    session: &'a Session<B>,
    builder: QueryBuilder<E, B::Context>,
    _shape: PhantomData<fn() -> R>,
}

impl<'a, E, B, R> Query<'a, E, B, R>
where
    E: Entity,
    B: Backend,
    R: ResultShape,
{
    pub(crate) const fn new(session: &'a Session<B>, builder: QueryBuilder<E, B::Context>) -> Self {
        Self {
            session,
            builder,
            _shape: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // State inspection
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn builder(&self) -> &QueryBuilder<E, B::Context> {
        &self.builder
    }

    #[must_use]
    pub fn into_builder(self) -> QueryBuilder<E, B::Context> {
        self.builder
    }

    #[must_use]
    pub fn fetch_request(&self) -> FetchRequest {
        self.builder.fetch_request()
    }

    #[must_use]
    pub fn describe(&self) -> RequestDescription {
        self.builder.describe()
    }

    #[must_use]
    pub fn fingerprint(&self) -> RequestFingerprint {
        self.builder.fetch_request().fingerprint()
    }

    fn map_builder(
        mut self,
        map: impl FnOnce(QueryBuilder<E, B::Context>) -> QueryBuilder<E, B::Context>,
    ) -> Self {
        self.builder = map(self.builder);
        self
    }

    fn retag<S: ResultShape>(
        self,
        map: impl FnOnce(QueryBuilder<E, B::Context>) -> QueryBuilder<E, B::Context>,
    ) -> Query<'a, E, B, S> {
        Query::new(self.session, map(self.builder))
    }

    // ------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------

    #[must_use]
    pub fn context(self, context: B::Context) -> Self {
        self.map_builder(|b| b.context(context))
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    #[must_use]
    pub fn filter(self, predicate: impl Into<Predicate>) -> Self {
        self.map_builder(|b| b.filter(predicate))
    }

    /// Filter with predicate-format text and positional `%@` / `%K` arguments.
    ///
    /// For example `filter_format("department.name == %@", ["Accounting"])`.
    pub fn filter_format<I>(self, format: &str, arguments: I) -> Result<Self, QueryError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let predicate = Predicate::from_format(format, arguments)?;

        Ok(self.filter(predicate))
    }

    /// Filter with a predicate built from the entity's attribute root.
    #[must_use]
    pub fn filter_with<P: Into<Predicate>>(self, build: impl FnOnce(&E::Attribute) -> P) -> Self {
        let predicate = build(&E::attribute());
        self.filter(predicate)
    }

    #[must_use]
    pub fn refilter(self) -> Self {
        self.map_builder(QueryBuilder::refilter)
    }

    // ------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------

    #[must_use]
    pub fn order<I>(self, ascending: bool, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: SortDescriptorConvertible,
    {
        self.map_builder(|b| b.order(ascending, keys))
    }

    #[must_use]
    pub fn order_with<I>(self, ascending: bool, build: impl FnOnce(&E::Attribute) -> I) -> Self
    where
        I: IntoIterator,
        I::Item: SortDescriptorConvertible,
    {
        let keys = build(&E::attribute());
        self.order(ascending, keys)
    }

    #[must_use]
    pub fn order_by(self, key: impl SortDescriptorConvertible) -> Self {
        self.map_builder(|b| b.order_by(key))
    }

    #[must_use]
    pub fn order_by_desc(self, key: impl SortDescriptorConvertible) -> Self {
        self.map_builder(|b| b.order_by_desc(key))
    }

    #[must_use]
    pub fn reorder(self) -> Self {
        self.map_builder(QueryBuilder::reorder)
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    #[must_use]
    pub fn limit(self, limit: u32) -> Self {
        self.map_builder(|b| b.limit(limit))
    }

    #[must_use]
    pub fn offset(self, offset: u32) -> Self {
        self.map_builder(|b| b.offset(offset))
    }

    // ------------------------------------------------------------------
    // Shape transitions
    // ------------------------------------------------------------------

    #[must_use]
    pub fn select<I>(self, properties: I) -> Query<'a, E, B, Dictionaries>
    where
        I: IntoIterator,
        I::Item: PropertyConvertible,
    {
        self.retag(|b| b.select(properties))
    }

    #[must_use]
    pub fn select_with<I>(
        self,
        build: impl FnOnce(&E::Attribute) -> I,
    ) -> Query<'a, E, B, Dictionaries>
    where
        I: IntoIterator,
        I::Item: PropertyConvertible,
    {
        let properties = build(&E::attribute());
        self.select(properties)
    }

    #[must_use]
    pub fn reselect(self) -> Query<'a, E, B, Dictionaries> {
        self.retag(QueryBuilder::reselect)
    }

    #[must_use]
    pub fn group_by<I>(self, properties: I) -> Query<'a, E, B, Dictionaries>
    where
        I: IntoIterator,
        I::Item: PropertyConvertible,
    {
        self.retag(|b| b.group_by(properties))
    }

    #[must_use]
    pub fn group_by_with<I>(
        self,
        build: impl FnOnce(&E::Attribute) -> I,
    ) -> Query<'a, E, B, Dictionaries>
    where
        I: IntoIterator,
        I::Item: PropertyConvertible,
    {
        let properties = build(&E::attribute());
        self.group_by(properties)
    }

    #[must_use]
    pub fn regroup(self) -> Query<'a, E, B, Dictionaries> {
        self.retag(QueryBuilder::regroup)
    }

    #[must_use]
    pub fn distinct(self, distinct: bool) -> Query<'a, E, B, Dictionaries> {
        self.retag(|b| b.distinct(distinct))
    }

    #[must_use]
    pub fn objects(self) -> Query<'a, E, B, Objects> {
        self.retag(QueryBuilder::objects)
    }

    #[must_use]
    pub fn ids(self) -> Query<'a, E, B, Ids> {
        self.retag(QueryBuilder::ids)
    }

    // ------------------------------------------------------------------
    // Translation
    // ------------------------------------------------------------------

    /// Translate into the backend's native request under the resolved context.
    pub fn request<'c>(
        &self,
        context: impl Into<Option<&'c B::Context>>,
    ) -> Result<B::Request, QueryError>
    where
        B::Context: 'c,
    {
        self.session.translate(&self.builder, context.into())
    }

    // ------------------------------------------------------------------
    // Execution terminals
    // ------------------------------------------------------------------

    /// Execute and return every result in request order.
    pub fn all<'c>(
        &self,
        context: impl Into<Option<&'c B::Context>>,
    ) -> Result<Vec<Row<R, B>>, QueryError>
    where
        B::Context: 'c,
    {
        self.session
            .execute_fetch(&self.builder, context.into())?
            .into_iter()
            .map(|row| {
                R::extract(row).ok_or(QueryError::UnexpectedRow {
                    expected: R::RESULT_TYPE,
                })
            })
            .collect()
    }

    /// Execute with `limit(1)` and return the single result, if any.
    pub fn first<'c>(
        &self,
        context: impl Into<Option<&'c B::Context>>,
    ) -> Result<Option<Row<R, B>>, QueryError>
    where
        B::Context: 'c,
    {
        let mut rows = self.clone().limit(1).all(context)?;
        if rows.len() > 1 {
            return Err(QueryError::invariant(format!(
                "first() received {} rows after limit(1)",
                rows.len()
            )));
        }

        Ok(rows.pop())
    }

    /// Execute as a count request; this query's own shape is unchanged.
    pub fn count<'c>(&self, context: impl Into<Option<&'c B::Context>>) -> Result<u64, QueryError>
    where
        B::Context: 'c,
    {
        let builder = self.builder.clone().with_result_type(ResultType::Count);

        self.session.execute_count(&builder, context.into())
    }

    /// Execute a `limit(1)` count and report whether any row matches.
    pub fn exists<'c>(&self, context: impl Into<Option<&'c B::Context>>) -> Result<bool, QueryError>
    where
        B::Context: 'c,
    {
        Ok(self.clone().limit(1).count(context)? > 0)
    }

    pub fn is_empty<'c>(
        &self,
        context: impl Into<Option<&'c B::Context>>,
    ) -> Result<bool, QueryError>
    where
        B::Context: 'c,
    {
        Ok(!self.exists(context)?)
    }

    /// Execute and iterate the results.
    pub fn rows<'c>(
        &self,
        context: impl Into<Option<&'c B::Context>>,
    ) -> Result<std::vec::IntoIter<Row<R, B>>, QueryError>
    where
        B::Context: 'c,
    {
        Ok(self.all(context)?.into_iter())
    }
}

// ----------------------------------------------------------------------
// Dictionary column helpers
// ----------------------------------------------------------------------

impl<E, B> Query<'_, E, B, Dictionaries>
where
    E: Entity,
    B: Backend,
{
    /// Fetch a single column and unwrap every row into `T`.
    ///
    /// Any earlier projection is replaced by `property`; filters, ordering,
    /// and paging are kept. A missing column reads as null.
    pub fn array<'c, T: FieldValue>(
        &self,
        property: impl PropertyConvertible,
        context: impl Into<Option<&'c B::Context>>,
    ) -> Result<Vec<T>, QueryError>
    where
        B::Context: 'c,
    {
        let property = property.property();
        let column = property.name().to_string();
        let rows = self.clone().reselect().select([property]).all(context)?;

        rows.iter()
            .map(|row| {
                let value = row.value(&column);
                T::from_value(value).ok_or_else(|| QueryError::ColumnType {
                    column: column.clone(),
                    expected: std::any::type_name::<T>(),
                    found: value.kind_name(),
                })
            })
            .collect()
    }

    pub fn array_with<'c, T: FieldValue, P: PropertyConvertible>(
        &self,
        context: impl Into<Option<&'c B::Context>>,
        build: impl FnOnce(&E::Attribute) -> P,
    ) -> Result<Vec<T>, QueryError>
    where
        B::Context: 'c,
    {
        self.array(build(&E::attribute()), context)
    }

    /// The first row's value for `property`, or `None` without rows.
    pub fn value<'c, T: FieldValue>(
        &self,
        property: impl PropertyConvertible,
        context: impl Into<Option<&'c B::Context>>,
    ) -> Result<Option<T>, QueryError>
    where
        B::Context: 'c,
    {
        let mut values = self.clone().limit(1).array(property, context)?;

        Ok(values.pop())
    }

    pub fn value_with<'c, T: FieldValue, P: PropertyConvertible>(
        &self,
        context: impl Into<Option<&'c B::Context>>,
        build: impl FnOnce(&E::Attribute) -> P,
    ) -> Result<Option<T>, QueryError>
    where
        B::Context: 'c,
    {
        self.value(build(&E::attribute()), context)
    }
}

impl<E, B, R> Clone for Query<'_, E, B, R>
where
    E: Entity,
    B: Backend,
    R: ResultShape,
{
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            builder: self.builder.clone(),
            _shape: PhantomData,
        }
    }
}

impl<E, B, R> fmt::Debug for Query<'_, E, B, R>
where
    E: Entity,
    B: Backend,
    R: ResultShape,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("shape", &R::RESULT_TYPE)
            .field("builder", &self.builder)
            .finish()
    }
}
