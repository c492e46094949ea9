#![allow(dead_code)]

use quarry_core::{
    db::{
        Backend, FetchRequest, FetchRow, Session,
        memory::{MemoryBackend, MemoryContext},
    },
    error::BackendError,
    model::path::AttributePath,
    traits::{Entity, EntityAttribute},
    value::{Dictionary, Value},
};
use std::cell::RefCell;

// ----------------------------------------------------------------------
// Entities
// ----------------------------------------------------------------------

pub struct Person;

impl Entity for Person {
    const ENTITY_NAME: &'static str = "Person";

    type Attribute = PersonAttribute;
}

#[derive(Clone, Debug)]
pub struct PersonAttribute(AttributePath);

impl EntityAttribute for PersonAttribute {
    fn from_path(path: AttributePath) -> Self {
        Self(path)
    }

    fn path(&self) -> &AttributePath {
        &self.0
    }
}

impl PersonAttribute {
    pub fn first_name(&self) -> AttributePath {
        self.0.child("firstName")
    }

    pub fn last_name(&self) -> AttributePath {
        self.0.child("lastName")
    }

    pub fn age(&self) -> AttributePath {
        self.0.child("age")
    }

    pub fn department(&self) -> UnitAttribute {
        UnitAttribute(self.0.child("department"))
    }
}

pub struct Unit;

impl Entity for Unit {
    const ENTITY_NAME: &'static str = "Unit";

    type Attribute = UnitAttribute;
}

#[derive(Clone, Debug)]
pub struct UnitAttribute(AttributePath);

impl EntityAttribute for UnitAttribute {
    fn from_path(path: AttributePath) -> Self {
        Self(path)
    }

    fn path(&self) -> &AttributePath {
        &self.0
    }
}

impl UnitAttribute {
    pub fn name(&self) -> AttributePath {
        self.0.child("name")
    }
}

// ----------------------------------------------------------------------
// Stores
// ----------------------------------------------------------------------

/// Store with the given (department, last name, first name, age) rows.
pub fn store(rows: &[(&str, &str, &str, i64)]) -> MemoryContext {
    let context = MemoryContext::with_entities([Unit::ENTITY_NAME, Person::ENTITY_NAME]);
    let mut units: Vec<(String, u64)> = Vec::new();

    for (unit, last, first, age) in rows {
        let known = units
            .iter()
            .find(|(name, _)| name.as_str() == *unit)
            .map(|(_, id)| *id);
        let unit_id = match known {
            Some(id) => id,
            None => {
                let id = context
                    .insert(Unit::ENTITY_NAME, Dictionary::new().with("name", *unit))
                    .expect("unit is registered");
                units.push(((*unit).to_string(), id));
                id
            }
        };

        context
            .insert(
                Person::ENTITY_NAME,
                Dictionary::new()
                    .with("firstName", *first)
                    .with("lastName", *last)
                    .with("age", *age)
                    .with("department", Value::ObjectId(unit_id)),
            )
            .expect("person is registered");
    }

    context
}

pub fn session() -> Session<MemoryBackend> {
    Session::new(MemoryBackend::new())
}

// ----------------------------------------------------------------------
// Recording backend
// ----------------------------------------------------------------------

///
/// RecordingBackend
///
/// Records every translated request and answers with canned results.
///

#[derive(Default)]
pub struct RecordingBackend {
    pub requests: RefCell<Vec<FetchRequest>>,
    pub fetch_calls: RefCell<usize>,
    pub count_answer: u64,
    pub rows: Vec<FetchRow<String, u32>>,
}

impl RecordingBackend {
    pub fn last_request(&self) -> FetchRequest {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("at least one request was translated")
    }
}

impl Backend for RecordingBackend {
    type Context = ();
    type Request = FetchRequest;
    type Object = String;
    type ObjectId = u32;

    fn resolve_default_context(&self) -> Option<()> {
        Some(())
    }

    fn translate(
        &self,
        request: &FetchRequest,
        _context: &(),
    ) -> Result<FetchRequest, BackendError> {
        self.requests.borrow_mut().push(request.clone());

        Ok(request.clone())
    }

    fn fetch(
        &self,
        _request: &FetchRequest,
        _context: &(),
    ) -> Result<Vec<FetchRow<String, u32>>, BackendError> {
        *self.fetch_calls.borrow_mut() += 1;

        Ok(self.rows.clone())
    }

    fn count(&self, _request: &FetchRequest, _context: &()) -> Result<u64, BackendError> {
        Ok(self.count_answer)
    }
}
