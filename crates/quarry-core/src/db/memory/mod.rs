//! Module: db::memory
//! Responsibility: reference backend that evaluates fetch requests over an
//! in-process object store.
//! Does not own: request construction or context resolution.
//! Boundary: reachable by the query layer only through `Backend`.

mod eval;
mod store;

#[cfg(test)]
mod tests;

pub use store::{MemoryContext, MemoryObject};

use crate::{
    db::{
        backend::{Backend, FetchRow},
        query::expr::Expression,
        request::{FetchRequest, Property, ResultType, SortDescriptor},
    },
    error::BackendError,
    value::{Dictionary, Value, canonical_cmp},
};
use eval::{Filter, aggregate, evaluate, resolve};
use std::cmp::Ordering;
use store::MemoryStore;

///
/// MemoryBackend
///

#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    default_context: Option<MemoryContext>,
}

impl MemoryBackend {
    /// Backend with no default context; every query must supply one.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_context: None,
        }
    }

    #[must_use]
    pub const fn with_default(context: MemoryContext) -> Self {
        Self {
            default_context: Some(context),
        }
    }
}

///
/// MemoryRequest
///
/// Validated fetch request with its predicate compiled.
///

#[derive(Debug)]
pub struct MemoryRequest {
    request: FetchRequest,
    filter: Option<Filter>,
}

impl MemoryRequest {
    #[must_use]
    pub const fn fetch_request(&self) -> &FetchRequest {
        &self.request
    }
}

impl Backend for MemoryBackend {
    type Context = MemoryContext;
    type Request = MemoryRequest;
    type Object = MemoryObject;
    type ObjectId = u64;

    fn resolve_default_context(&self) -> Option<MemoryContext> {
        self.default_context.clone()
    }

    fn translate(
        &self,
        request: &FetchRequest,
        context: &MemoryContext,
    ) -> Result<MemoryRequest, BackendError> {
        if !context.with_store(|store| store.is_registered(&request.entity)) {
            return Err(BackendError::invalid_request(format!(
                "entity '{}' is not registered in this store",
                request.entity
            )));
        }

        if request.properties_to_group_by.is_some()
            && !matches!(
                request.result_type,
                ResultType::Dictionary | ResultType::Count
            )
        {
            return Err(BackendError::invalid_request(format!(
                "group-by requires dictionary results, not {}",
                request.result_type
            )));
        }

        let filter = request.predicate.as_ref().map(Filter::compile).transpose()?;

        Ok(MemoryRequest {
            request: request.clone(),
            filter,
        })
    }

    fn fetch(
        &self,
        request: &MemoryRequest,
        context: &MemoryContext,
    ) -> Result<Vec<FetchRow<MemoryObject, u64>>, BackendError> {
        let fetch = &request.request;

        context.with_store(|store| {
            let objects = matching_objects(store, request)?;

            Ok(match fetch.result_type {
                ResultType::Object => page(objects, fetch)
                    .into_iter()
                    .map(|object| FetchRow::Object(object.clone()))
                    .collect(),
                ResultType::ObjectId => page(objects, fetch)
                    .into_iter()
                    .map(|object| FetchRow::ObjectId(object.id()))
                    .collect(),
                ResultType::Dictionary => page(dictionaries(store, fetch, &objects), fetch)
                    .into_iter()
                    .map(FetchRow::Dictionary)
                    .collect(),
                ResultType::Count => {
                    return Err(BackendError::unsupported(
                        "count requests are answered by count, not fetch",
                    ));
                }
            })
        })
    }

    fn count(&self, request: &MemoryRequest, context: &MemoryContext) -> Result<u64, BackendError> {
        let fetch = &request.request;

        context.with_store(|store| {
            let objects = matching_objects(store, request)?;
            let rows = if counts_dictionaries(fetch) {
                dictionaries(store, fetch, &objects).len()
            } else {
                objects.len()
            };

            let offset = fetch.fetch_offset.map_or(0, as_len);
            let paged = rows
                .saturating_sub(offset)
                .min(fetch.fetch_limit.map_or(usize::MAX, as_len));

            Ok(u64::try_from(paged).unwrap_or(u64::MAX))
        })
    }
}

// ----------------------------------------------------------------------
// Pipeline: filter → sort → shape → page
// ----------------------------------------------------------------------

fn matching_objects<'s>(
    store: &'s MemoryStore,
    request: &MemoryRequest,
) -> Result<Vec<&'s MemoryObject>, BackendError> {
    let mut matched = Vec::new();
    for object in store.objects_of(&request.request.entity) {
        let keep = match &request.filter {
            Some(filter) => filter.matches(store, object)?,
            None => true,
        };
        if keep {
            matched.push(object);
        }
    }

    Ok(sort_objects(store, matched, &request.request.sort_descriptors))
}

// Stable: ties keep insertion order.
fn sort_objects<'s>(
    store: &MemoryStore,
    objects: Vec<&'s MemoryObject>,
    sorts: &[SortDescriptor],
) -> Vec<&'s MemoryObject> {
    if sorts.is_empty() {
        return objects;
    }

    let mut keyed: Vec<(Vec<Value>, &MemoryObject)> = objects
        .into_iter()
        .map(|object| {
            let keys = sorts.iter().map(|sort| resolve(store, object, &sort.key)).collect();
            (keys, object)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        sorts
            .iter()
            .zip(a.iter().zip(b))
            .map(|(sort, (x, y))| {
                let ordering = canonical_cmp(x, y);
                if sort.ascending { ordering } else { ordering.reverse() }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    keyed.into_iter().map(|(_, object)| object).collect()
}

fn page<T>(rows: Vec<T>, request: &FetchRequest) -> Vec<T> {
    rows.into_iter()
        .skip(request.fetch_offset.map_or(0, as_len))
        .take(request.fetch_limit.map_or(usize::MAX, as_len))
        .collect()
}

fn as_len(n: u32) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

// A count over a dictionary request counts grouped or de-duplicated rows.
fn counts_dictionaries(request: &FetchRequest) -> bool {
    matches!(
        request.result_type,
        ResultType::Dictionary | ResultType::Count
    ) && (request.distinct || is_grouped(request))
}

// ----------------------------------------------------------------------
// Dictionary rows
// ----------------------------------------------------------------------

const fn is_aggregate(property: &Property) -> bool {
    matches!(
        property,
        Property::Expression(description)
            if matches!(description.expression, Expression::Function { .. })
    )
}

fn is_grouped(request: &FetchRequest) -> bool {
    request.properties_to_group_by.is_some()
        || request
            .properties_to_fetch
            .as_deref()
            .is_some_and(|properties| properties.iter().any(is_aggregate))
}

fn dictionaries(
    store: &MemoryStore,
    request: &FetchRequest,
    objects: &[&MemoryObject],
) -> Vec<Dictionary> {
    let properties = request.properties_to_fetch.as_deref();

    let rows: Vec<Dictionary> = if is_grouped(request) {
        let group_by = request.properties_to_group_by.as_deref().unwrap_or_default();
        let columns = properties.unwrap_or(group_by);

        groups(store, group_by, objects)
            .into_iter()
            .map(|members| group_row(store, columns, &members))
            .collect()
    } else {
        objects
            .iter()
            .map(|object| project(store, object, properties))
            .collect()
    };

    if !request.distinct {
        return rows;
    }

    let mut unique: Vec<Dictionary> = Vec::with_capacity(rows.len());
    for row in rows {
        if !unique.contains(&row) {
            unique.push(row);
        }
    }

    unique
}

fn property_value(store: &MemoryStore, object: &MemoryObject, property: &Property) -> Value {
    match property {
        Property::Attribute(key) => resolve(store, object, key),
        Property::Expression(description) => evaluate(store, object, &description.expression),
    }
}

// Null columns are omitted, matching how a sparse row reads back.
fn project(
    store: &MemoryStore,
    object: &MemoryObject,
    properties: Option<&[Property]>,
) -> Dictionary {
    let Some(properties) = properties else {
        return object.values().clone();
    };

    properties
        .iter()
        .map(|property| (property.name(), property_value(store, object, property)))
        .filter(|(_, value)| !value.is_null())
        .collect()
}

/// Partition objects by group-by key, in order of first appearance.
///
/// Without group-by properties everything lands in one group.
fn groups<'s>(
    store: &MemoryStore,
    group_by: &[Property],
    objects: &[&'s MemoryObject],
) -> Vec<Vec<&'s MemoryObject>> {
    if group_by.is_empty() {
        return vec![objects.to_vec()];
    }

    let mut groups: Vec<(Vec<Value>, Vec<&MemoryObject>)> = Vec::new();
    for &object in objects {
        let key: Vec<Value> = group_by
            .iter()
            .map(|property| property_value(store, object, property))
            .collect();

        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(object),
            None => groups.push((key, vec![object])),
        }
    }

    groups.into_iter().map(|(_, members)| members).collect()
}

fn group_row(store: &MemoryStore, columns: &[Property], members: &[&MemoryObject]) -> Dictionary {
    columns
        .iter()
        .map(|property| {
            let value = match property {
                Property::Expression(description) => match &description.expression {
                    Expression::Function {
                        function,
                        arguments,
                    } => {
                        let values = arguments
                            .first()
                            .map(|argument| {
                                members
                                    .iter()
                                    .flat_map(|object| match evaluate(store, object, argument) {
                                        Value::List(items) => items,
                                        single => vec![single],
                                    })
                                    .collect()
                            })
                            .unwrap_or_default();

                        aggregate(*function, values)
                    }
                    _ => first_value(store, members, property),
                },
                Property::Attribute(_) => first_value(store, members, property),
            };

            (property.name(), value)
        })
        .filter(|(_, value)| !value.is_null())
        .collect()
}

fn first_value(store: &MemoryStore, members: &[&MemoryObject], property: &Property) -> Value {
    members
        .first()
        .map_or(Value::Null, |object| property_value(store, object, property))
}
