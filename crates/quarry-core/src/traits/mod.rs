
use crate::{model::path::AttributePath, value::Value};

///
/// Entity
///
/// Compile-time identity of a queryable entity.
/// `Attribute` is the entity's typed attribute root (normally generated),
/// handed to the closure forms of `filter_with`, `order_with`, and friends.
///

pub trait Entity: 'static {
    const ENTITY_NAME: &'static str;

    type Attribute: EntityAttribute;

    /// Build a fresh attribute root for this entity.
    #[must_use]
    fn attribute() -> Self::Attribute {
        Self::Attribute::from_path(AttributePath::root())
    }
}

///
/// EntityAttribute
///
/// A typed view over one node of an attribute-path tree.
/// `AttributePath` itself is the untyped implementation.
///

pub trait EntityAttribute {
    fn from_path(path: AttributePath) -> Self;

    fn path(&self) -> &AttributePath;
}

impl EntityAttribute for AttributePath {
    fn from_path(path: AttributePath) -> Self {
        path
    }

    fn path(&self) -> &AttributePath {
        self
    }
}

///
/// FieldValue
///
/// Conversion between Rust values and runtime `Value`s.
/// `from_value` is the typed unwrap used for projected columns; it returns
/// `None` when the runtime value has a different kind.
///
/// `&str` is input-only: it converts into a `Value` for predicate operands,
/// but cannot borrow out of one, so its `from_value` is always `None`.
/// Read text columns as `String`.
///

pub trait FieldValue {
    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

// Input-only; see the trait docs.
impl FieldValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FieldValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[expect(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v as Self)
    }
}

// Integers accept either integer kind as long as the value fits.
macro_rules! impl_field_value_int {
    ( $( $variant:ident => $($ty:ty),+ );* $(;)? ) => {
        $(
            $(
                impl FieldValue for $ty {
                    fn to_value(&self) -> Value {
                        Value::$variant((*self).into())
                    }

                    fn from_value(value: &Value) -> Option<Self> {
                        match value {
                            Value::Int(v) => Self::try_from(*v).ok(),
                            Value::Uint(v) => Self::try_from(*v).ok(),
                            _ => None,
                        }
                    }
                }
            )+
        )*
    };
}

impl_field_value_int! {
    Int => i8, i16, i32, i64;
    Uint => u8, u16, u32, u64;
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}
