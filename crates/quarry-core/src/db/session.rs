use crate::{
    db::{
        backend::{Backend, FetchRow},
        query::{Query, QueryBuilder},
    },
    error::QueryError,
    obs::sink::{ExecKind, MetricsSink, Span, with_metrics_sink},
    traits::Entity,
};
use std::borrow::Cow;

type BackendRows<B> = Vec<FetchRow<<B as Backend>::Object, <B as Backend>::ObjectId>>;

///
/// Session
///
/// Backend handle with policy (metrics) and execution routing.
/// Queries borrow the session for their whole chain.
///

pub struct Session<B: Backend> {
    backend: B,
    metrics: Option<&'static dyn MetricsSink>,
}

impl<B: Backend> Session<B> {
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            metrics: None,
        }
    }

    /// Route this session's execution events to `sink` instead of the
    /// process-global counters.
    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        if let Some(sink) = self.metrics {
            with_metrics_sink(sink, f)
        } else {
            f()
        }
    }

    // ---------------------------------------------------------------------
    // Query entry point
    // ---------------------------------------------------------------------

    /// Start an object-shaped query over entity `E`.
    #[must_use]
    pub const fn query<E: Entity>(&self) -> Query<'_, E, B> {
        Query::new(self, QueryBuilder::new())
    }

    // ---------------------------------------------------------------------
    // Execution routing (crate-internal)
    // ---------------------------------------------------------------------

    /// Pick the execution context: explicit argument, then the query's own
    /// context, then the backend default.
    pub(crate) fn resolve_context<'c, E: Entity>(
        &self,
        builder: &'c QueryBuilder<E, B::Context>,
        explicit: Option<&'c B::Context>,
    ) -> Result<Cow<'c, B::Context>, QueryError> {
        if let Some(context) = explicit.or_else(|| builder.context_ref()) {
            return Ok(Cow::Borrowed(context));
        }

        self.backend
            .resolve_default_context()
            .map(Cow::Owned)
            .ok_or(QueryError::UnresolvedContext {
                entity: E::ENTITY_NAME,
            })
    }

    pub(crate) fn translate<E: Entity>(
        &self,
        builder: &QueryBuilder<E, B::Context>,
        explicit: Option<&B::Context>,
    ) -> Result<B::Request, QueryError> {
        let context = self.resolve_context(builder, explicit)?;

        Ok(builder.request(&self.backend, &context)?)
    }

    pub(crate) fn execute_fetch<E: Entity>(
        &self,
        builder: &QueryBuilder<E, B::Context>,
        explicit: Option<&B::Context>,
    ) -> Result<BackendRows<B>, QueryError> {
        let context = self.resolve_context(builder, explicit)?;
        let request = builder.fetch_request();

        self.with_metrics(|| {
            let mut span = Span::new(ExecKind::Fetch, E::ENTITY_NAME, request.fingerprint());
            let result = self
                .backend
                .translate(&request, &context)
                .and_then(|native| self.backend.fetch(&native, &context));

            match &result {
                Ok(rows) => span.set_rows(u64::try_from(rows.len()).unwrap_or(u64::MAX)),
                Err(err) => span.set_error(Some(err.class)),
            }

            result.map_err(QueryError::from)
        })
    }

    pub(crate) fn execute_count<E: Entity>(
        &self,
        builder: &QueryBuilder<E, B::Context>,
        explicit: Option<&B::Context>,
    ) -> Result<u64, QueryError> {
        let context = self.resolve_context(builder, explicit)?;
        let request = builder.fetch_request();

        self.with_metrics(|| {
            let mut span = Span::new(ExecKind::Count, E::ENTITY_NAME, request.fingerprint());
            let result = self
                .backend
                .translate(&request, &context)
                .and_then(|native| self.backend.count(&native, &context));

            match &result {
                Ok(count) => span.set_rows(*count),
                Err(err) => span.set_error(Some(err.class)),
            }

            result.map_err(QueryError::from)
        })
    }
}
