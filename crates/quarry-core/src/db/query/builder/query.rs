use crate::{
    db::{
        backend::Backend,
        query::predicate::Predicate,
        request::{
            FetchRequest, Property, PropertyConvertible, RequestDescription, ResultType,
            SortDescriptor, SortDescriptorConvertible,
        },
    },
    error::BackendError,
    traits::Entity,
};
use std::{fmt, marker::PhantomData};

///
/// QueryBuilder
///
/// Immutable snapshot of every fetch parameter for entity `E`, with an
/// optional execution context of type `C`.
///
/// Every refinement consumes the builder and returns the next snapshot, so a
/// builder shared by an earlier query value is never touched. Filters are
/// conjoined; sort descriptors, projections, and groupings keep call order.
///

pub struct QueryBuilder<E: Entity, C> {
    context: Option<C>,
    predicates: Vec<Predicate>,
    sort_descriptors: Vec<SortDescriptor>,
    properties_to_fetch: Option<Vec<Property>>,
    properties_to_group_by: Option<Vec<Property>>,
    fetch_limit: Option<u32>,
    fetch_offset: Option<u32>,
    distinct: bool,
    result_type: ResultType,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity, C> QueryBuilder<E, C> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            context: None,
            predicates: Vec::new(),
            sort_descriptors: Vec::new(),
            properties_to_fetch: None,
            properties_to_group_by: None,
            fetch_limit: None,
            fetch_offset: None,
            distinct: false,
            result_type: ResultType::Object,
            _marker: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------

    /// Replace the execution context carried by this query.
    #[must_use]
    pub fn context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    /// Append one predicate to the conjunction.
    #[must_use]
    pub fn filter(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    /// Drop every accumulated predicate.
    #[must_use]
    pub fn refilter(mut self) -> Self {
        self.predicates.clear();
        self
    }

    // ------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------

    /// Append sort descriptors in iteration order.
    ///
    /// `ascending` applies to key-path inputs; a ready-made `SortDescriptor`
    /// keeps its own direction.
    #[must_use]
    pub fn order<I>(mut self, ascending: bool, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: SortDescriptorConvertible,
    {
        self.sort_descriptors
            .extend(keys.into_iter().map(|key| key.sort_descriptor(ascending)));
        self
    }

    #[must_use]
    pub fn order_by(self, key: impl SortDescriptorConvertible) -> Self {
        self.order(true, [key])
    }

    #[must_use]
    pub fn order_by_desc(self, key: impl SortDescriptorConvertible) -> Self {
        self.order(false, [key])
    }

    #[must_use]
    pub fn reorder(mut self) -> Self {
        self.sort_descriptors.clear();
        self
    }

    // ------------------------------------------------------------------
    // Projection and grouping
    // ------------------------------------------------------------------

    /// Append projected properties; forces the dictionary shape.
    #[must_use]
    pub fn select<I>(mut self, properties: I) -> Self
    where
        I: IntoIterator,
        I::Item: PropertyConvertible,
    {
        self.result_type = ResultType::Dictionary;
        self.properties_to_fetch
            .get_or_insert_with(Vec::new)
            .extend(properties.into_iter().map(|p| p.property()));
        self
    }

    /// Fetch every property again while staying in the dictionary shape.
    #[must_use]
    pub fn reselect(mut self) -> Self {
        self.result_type = ResultType::Dictionary;
        self.properties_to_fetch = None;
        self
    }

    /// Append group-by properties; forces the dictionary shape.
    #[must_use]
    pub fn group_by<I>(mut self, properties: I) -> Self
    where
        I: IntoIterator,
        I::Item: PropertyConvertible,
    {
        self.result_type = ResultType::Dictionary;
        self.properties_to_group_by
            .get_or_insert_with(Vec::new)
            .extend(properties.into_iter().map(|p| p.property()));
        self
    }

    #[must_use]
    pub fn regroup(mut self) -> Self {
        self.result_type = ResultType::Dictionary;
        self.properties_to_group_by = None;
        self
    }

    /// Set the distinct flag; forces the dictionary shape either way.
    #[must_use]
    pub const fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self.result_type = ResultType::Dictionary;
        self
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.fetch_limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.fetch_offset = Some(offset);
        self
    }

    // ------------------------------------------------------------------
    // Shape resets
    // ------------------------------------------------------------------

    /// Return to the object shape, dropping projection and grouping.
    #[must_use]
    pub fn objects(self) -> Self {
        self.reset_shape(ResultType::Object)
    }

    /// Switch to the identifier shape, dropping projection and grouping.
    #[must_use]
    pub fn ids(self) -> Self {
        self.reset_shape(ResultType::ObjectId)
    }

    fn reset_shape(mut self, result_type: ResultType) -> Self {
        self.properties_to_fetch = None;
        self.properties_to_group_by = None;
        self.result_type = result_type;
        self
    }

    /// Override the result type without touching projection state.
    ///
    /// Used by execution to derive count requests.
    #[must_use]
    pub(crate) const fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn context_ref(&self) -> Option<&C> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// The accumulated filters conjoined into a single predicate, if any.
    #[must_use]
    pub fn predicate(&self) -> Option<Predicate> {
        Predicate::conjoin(&self.predicates)
    }

    #[must_use]
    pub fn sort_descriptors(&self) -> &[SortDescriptor] {
        &self.sort_descriptors
    }

    #[must_use]
    pub fn properties_to_fetch(&self) -> Option<&[Property]> {
        self.properties_to_fetch.as_deref()
    }

    #[must_use]
    pub fn properties_to_group_by(&self) -> Option<&[Property]> {
        self.properties_to_group_by.as_deref()
    }

    #[must_use]
    pub const fn fetch_limit(&self) -> Option<u32> {
        self.fetch_limit
    }

    #[must_use]
    pub const fn fetch_offset(&self) -> Option<u32> {
        self.fetch_offset
    }

    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    #[must_use]
    pub const fn result_type(&self) -> ResultType {
        self.result_type
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Materialize the backend-agnostic request for this snapshot.
    #[must_use]
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            entity: E::ENTITY_NAME.to_string(),
            predicate: self.predicate(),
            sort_descriptors: self.sort_descriptors.clone(),
            properties_to_fetch: self.properties_to_fetch.clone(),
            properties_to_group_by: self.properties_to_group_by.clone(),
            fetch_limit: self.fetch_limit,
            fetch_offset: self.fetch_offset,
            distinct: self.distinct,
            result_type: self.result_type,
        }
    }

    #[must_use]
    pub fn describe(&self) -> RequestDescription {
        self.fetch_request().describe()
    }

    /// Translate into the backend's native request.
    ///
    /// Backends that resolve entity schema do so through `context`.
    pub fn request<B>(&self, backend: &B, context: &C) -> Result<B::Request, BackendError>
    where
        B: Backend<Context = C>,
    {
        backend.translate(&self.fetch_request(), context)
    }
}

impl<E: Entity, C> Default for QueryBuilder<E, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity, C: Clone> Clone for QueryBuilder<E, C> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            predicates: self.predicates.clone(),
            sort_descriptors: self.sort_descriptors.clone(),
            properties_to_fetch: self.properties_to_fetch.clone(),
            properties_to_group_by: self.properties_to_group_by.clone(),
            fetch_limit: self.fetch_limit,
            fetch_offset: self.fetch_offset,
            distinct: self.distinct,
            result_type: self.result_type,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity, C> fmt::Debug for QueryBuilder<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("entity", &E::ENTITY_NAME)
            .field("has_context", &self.context.is_some())
            .field("predicates", &self.predicates)
            .field("sort_descriptors", &self.sort_descriptors)
            .field("properties_to_fetch", &self.properties_to_fetch)
            .field("properties_to_group_by", &self.properties_to_group_by)
            .field("fetch_limit", &self.fetch_limit)
            .field("fetch_offset", &self.fetch_offset)
            .field("distinct", &self.distinct)
            .field("result_type", &self.result_type)
            .finish()
    }
}
