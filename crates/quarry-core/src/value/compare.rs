use crate::value::Value;
use std::cmp::Ordering;

/// Compare two numeric values with cross-kind widening.
///
/// Returns `None` if either side is not numeric or a float is NaN.
#[must_use]
pub fn numeric_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Uint(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Uint(a), Value::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        _ => {
            let a = left.as_f64()?;
            let b = right.as_f64()?;
            a.partial_cmp(&b)
        }
    }
}

/// Ordering for values of the same kind (numerics widen across kinds).
///
/// Returns `None` for mismatched kinds or kinds without an ordering.
#[must_use]
pub fn strict_ordering(left: &Value, right: &Value) -> Option<Ordering> {
    if left.is_numeric() && right.is_numeric() {
        return numeric_cmp(left, right);
    }

    match (left, right) {
        (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => list_ordering(a, b),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::ObjectId(a), Value::ObjectId(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Canonical total ordering used for sorting and MIN/MAX.
///
/// Nulls sort first and mismatched kinds fall back to a fixed kind rank.
/// Floats follow IEEE total order, so NaN sorts after every number.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
        (Value::Float(f), other) | (other, Value::Float(f)) if other.is_numeric() => {
            let ordering = integral_float_cmp(other, *f);
            if matches!(left, Value::Float(_)) {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Value::List(a), Value::List(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| canonical_cmp(x, y))
            .find(|&ordering| ordering != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => strict_ordering(left, right)
            .unwrap_or_else(|| canonical_rank(left).cmp(&canonical_rank(right))),
    }
}

// Orders an integer against a float; ties after widening are settled exactly.
fn integral_float_cmp(int: &Value, float: f64) -> Ordering {
    let exact = match int {
        Value::Int(v) => i128::from(*v),
        Value::Uint(v) => i128::from(*v),
        _ => return Ordering::Equal,
    };

    #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let (widened, truncated) = (exact as f64, float as i128);

    match widened.total_cmp(&float) {
        Ordering::Equal => exact.cmp(&truncated),
        ordering => ordering,
    }
}

const fn canonical_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Float(_) | Value::Int(_) | Value::Uint(_) => 2,
        Value::Text(_) => 3,
        Value::Blob(_) => 4,
        Value::ObjectId(_) => 5,
        Value::List(_) => 6,
    }
}

fn list_ordering(left: &[Value], right: &[Value]) -> Option<Ordering> {
    for (a, b) in left.iter().zip(right) {
        let ordering = strict_ordering(a, b)?;
        if ordering != Ordering::Equal {
            return Some(ordering);
        }
    }

    Some(left.len().cmp(&right.len()))
}
