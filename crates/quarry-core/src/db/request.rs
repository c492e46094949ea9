//! Module: db::request
//! Responsibility: the canonical fetch request handed to backends, plus its
//! description and fingerprint.
//! Does not own: backend-native request types (see `Backend::translate`).
//! Boundary: output of `QueryBuilder::fetch_request`, input of translation.

use crate::db::query::{
    expr::{ExpressionDescription, KeyPathConvertible},
    predicate::Predicate,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

///
/// ResultType
///
/// Shape of each element a fetch produces.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ResultType {
    #[default]
    Object,
    ObjectId,
    Dictionary,
    Count,
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Object => "object",
            Self::ObjectId => "object_id",
            Self::Dictionary => "dictionary",
            Self::Count => "count",
        };
        f.write_str(label)
    }
}

///
/// SortDescriptor
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SortDescriptor {
    pub key: String,
    pub ascending: bool,
}

impl SortDescriptor {
    #[must_use]
    pub fn new(key: impl Into<String>, ascending: bool) -> Self {
        Self {
            key: key.into(),
            ascending,
        }
    }

    #[must_use]
    pub fn asc(key: impl Into<String>) -> Self {
        Self::new(key, true)
    }

    #[must_use]
    pub fn desc(key: impl Into<String>) -> Self {
        Self::new(key, false)
    }
}

impl fmt::Display for SortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "{} {direction}", self.key)
    }
}

///
/// SortDescriptorConvertible
///
/// Key-path-like inputs take the direction given at the call site;
/// a ready-made `SortDescriptor` keeps its own.
///

pub trait SortDescriptorConvertible {
    fn sort_descriptor(&self, ascending: bool) -> SortDescriptor;
}

impl<K: KeyPathConvertible> SortDescriptorConvertible for K {
    fn sort_descriptor(&self, ascending: bool) -> SortDescriptor {
        SortDescriptor::new(self.key_path(), ascending)
    }
}

impl SortDescriptorConvertible for SortDescriptor {
    fn sort_descriptor(&self, _ascending: bool) -> SortDescriptor {
        self.clone()
    }
}

///
/// Property
///
/// One projection or group-by entry.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Property {
    Attribute(String),
    Expression(ExpressionDescription),
}

impl Property {
    /// Column name this property occupies in a dictionary row.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Attribute(key) => key,
            Self::Expression(description) => &description.name,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(key) => f.write_str(key),
            Self::Expression(description) => {
                write!(f, "{} AS {}", description.expression, description.name)
            }
        }
    }
}

///
/// PropertyConvertible
///

pub trait PropertyConvertible {
    fn property(&self) -> Property;
}

impl<K: KeyPathConvertible> PropertyConvertible for K {
    fn property(&self) -> Property {
        Property::Attribute(self.key_path())
    }
}

impl PropertyConvertible for ExpressionDescription {
    fn property(&self) -> Property {
        Property::Expression(self.clone())
    }
}

impl PropertyConvertible for Property {
    fn property(&self) -> Property {
        self.clone()
    }
}

///
/// FetchRequest
///
/// Fully materialized, backend-agnostic fetch request.
/// Predicates are already conjoined; every list keeps call order.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FetchRequest {
    pub entity: String,
    pub predicate: Option<Predicate>,
    pub sort_descriptors: Vec<SortDescriptor>,
    pub properties_to_fetch: Option<Vec<Property>>,
    pub properties_to_group_by: Option<Vec<Property>>,
    pub fetch_limit: Option<u32>,
    pub fetch_offset: Option<u32>,
    pub distinct: bool,
    pub result_type: ResultType,
}

impl FetchRequest {
    /// Empty request for one entity: no filter, order, projection, or paging.
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: None,
            sort_descriptors: Vec::new(),
            properties_to_fetch: None,
            properties_to_group_by: None,
            fetch_limit: None,
            fetch_offset: None,
            distinct: false,
            result_type: ResultType::Object,
        }
    }

    #[must_use]
    pub fn describe(&self) -> RequestDescription {
        RequestDescription {
            entity: self.entity.clone(),
            predicate: self.predicate.as_ref().map(ToString::to_string),
            sort_descriptors: self
                .sort_descriptors
                .iter()
                .map(ToString::to_string)
                .collect(),
            properties_to_fetch: describe_properties(self.properties_to_fetch.as_deref()),
            properties_to_group_by: describe_properties(self.properties_to_group_by.as_deref()),
            fetch_limit: self.fetch_limit,
            fetch_offset: self.fetch_offset,
            distinct: self.distinct,
            result_type: self.result_type,
        }
    }

    /// Stable hash of the canonical description.
    #[must_use]
    pub fn fingerprint(&self) -> RequestFingerprint {
        self.describe().fingerprint()
    }
}

fn describe_properties(properties: Option<&[Property]>) -> Option<Vec<String>> {
    properties.map(|list| list.iter().map(ToString::to_string).collect())
}

///
/// RequestDescription
///
/// Textual, serializable view of a fetch request.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RequestDescription {
    pub entity: String,
    pub predicate: Option<String>,
    pub sort_descriptors: Vec<String>,
    pub properties_to_fetch: Option<Vec<String>>,
    pub properties_to_group_by: Option<Vec<String>>,
    pub fetch_limit: Option<u32>,
    pub fetch_offset: Option<u32>,
    pub distinct: bool,
    pub result_type: ResultType,
}

impl RequestDescription {
    #[must_use]
    pub fn fingerprint(&self) -> RequestFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());

        RequestFingerprint(hasher.finalize().into())
    }
}

impl fmt::Display for RequestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FETCH {} AS {}", self.entity, self.result_type)?;
        if let Some(properties) = &self.properties_to_fetch {
            write!(f, " SELECT [{}]", properties.join(", "))?;
        }
        if self.distinct {
            f.write_str(" DISTINCT")?;
        }
        if let Some(predicate) = &self.predicate {
            write!(f, " WHERE {predicate}")?;
        }
        if let Some(groups) = &self.properties_to_group_by {
            write!(f, " GROUP BY [{}]", groups.join(", "))?;
        }
        if !self.sort_descriptors.is_empty() {
            write!(f, " ORDER BY [{}]", self.sort_descriptors.join(", "))?;
        }
        if let Some(limit) = self.fetch_limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.fetch_offset {
            write!(f, " OFFSET {offset}")?;
        }

        Ok(())
    }
}

///
/// RequestFingerprint
///
/// SHA-256 over the canonical request description.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RequestFingerprint([u8; 32]);

impl RequestFingerprint {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::query::expr::{ExpressionConvertible, ExpressionDescription},
        model::path::AttributePath,
    };

    fn sample() -> FetchRequest {
        let root = AttributePath::root();
        let mut request = FetchRequest::new("Employee");
        request.predicate = Some(root.child("department").child("name").equal_to("Sales").into());
        request.sort_descriptors = vec![
            SortDescriptor::desc("lastName"),
            SortDescriptor::asc("firstName"),
        ];
        request.fetch_limit = Some(10);
        request.fetch_offset = Some(5);

        request
    }

    #[test]
    fn description_renders_canonical_text() {
        assert_eq!(
            sample().describe().to_string(),
            "FETCH Employee AS object WHERE department.name == \"Sales\" \
             ORDER BY [lastName DESC, firstName ASC] LIMIT 10 OFFSET 5"
        );
    }

    #[test]
    fn description_survives_serialization() {
        let description = sample().describe();
        let json = serde_json::to_string(&description).expect("serialize description");
        let back: RequestDescription = serde_json::from_str(&json).expect("parse description");

        assert_eq!(back, description);
    }

    #[test]
    fn request_survives_serialization() {
        let mut request = sample();
        request.result_type = ResultType::Dictionary;
        request.properties_to_fetch = Some(vec![
            Property::Attribute("department.name".to_string()),
            ExpressionDescription::sum("salary", Some("total")).property(),
        ]);
        request.properties_to_group_by = Some(vec!["department.name".property()]);

        let json = serde_json::to_string(&request).expect("serialize request");
        let back: FetchRequest = serde_json::from_str(&json).expect("parse request");

        assert_eq!(back, request);
        assert_eq!(back.describe(), request.describe());
    }

    #[test]
    fn fingerprint_tracks_description() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.fetch_limit = Some(11);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().to_string().len(), 64);
    }

    #[test]
    fn descriptor_keeps_its_own_direction() {
        let explicit = SortDescriptor::desc("salary");

        assert_eq!(explicit.sort_descriptor(true), explicit);
        assert_eq!("salary".sort_descriptor(false), explicit);
    }

    #[test]
    fn property_names_follow_columns() {
        let path = AttributePath::root().child("department").child("name");
        let count = ExpressionDescription::count(path.clone(), Some("n"));

        assert_eq!(path.property().name(), "department.name");
        assert_eq!(count.property().name(), "n");
        assert_eq!(count.property().to_string(), "count:(department.name) AS n");
        assert_eq!(
            path.equal_to("x").to_string(),
            "department.name == \"x\""
        );
    }
}
