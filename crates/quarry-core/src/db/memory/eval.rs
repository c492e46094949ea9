//! Expression and predicate evaluation over stored objects.

use crate::{
    db::{
        memory::store::{MemoryObject, MemoryStore},
        query::{
            expr::{Expression, Function},
            predicate::{CompareOp, ComparisonOptions, ComparisonPredicate, Predicate},
        },
    },
    error::BackendError,
    value::{Dictionary, Value, canonical_cmp, numeric_cmp, strict_ordering},
};
use glob::{MatchOptions, Pattern};
use regex::{Regex, RegexBuilder};
use std::{borrow::Cow, cmp::Ordering};

// ----------------------------------------------------------------------
// Text folding
// ----------------------------------------------------------------------

/// Apply the case and diacritic folds requested by `options`.
///
/// `NORMALIZED` promises pre-normalized input, so it adds no work here.
pub(crate) fn fold_text(text: &str, options: ComparisonOptions) -> Cow<'_, str> {
    let diacritics = options.contains(ComparisonOptions::DIACRITIC_INSENSITIVE);
    let case = options.contains(ComparisonOptions::CASE_INSENSITIVE);

    match (diacritics, case) {
        (false, false) => Cow::Borrowed(text),
        (true, false) => Cow::Owned(text.chars().map(strip_diacritic).collect()),
        (false, true) => Cow::Owned(text.to_lowercase()),
        (true, true) => Cow::Owned(
            text.chars()
                .map(strip_diacritic)
                .collect::<String>()
                .to_lowercase(),
        ),
    }
}

// Latin-1 and common Latin Extended-A letters only.
const fn strip_diacritic(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'ď' => 'd',
        'Ď' => 'D',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' => 'I',
        'ł' => 'l',
        'Ł' => 'L',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => 'O',
        'ř' => 'r',
        'Ř' => 'R',
        'ś' | 'š' | 'ş' => 's',
        'Ś' | 'Š' | 'Ş' => 'S',
        'ť' | 'ţ' => 't',
        'Ť' | 'Ţ' => 'T',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        'ź' | 'ż' | 'ž' => 'z',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        other => other,
    }
}

// ----------------------------------------------------------------------
// Key paths and expressions
// ----------------------------------------------------------------------

/// Resolve a dotted key path against one object, following relationships.
///
/// The empty key yields the object's own identifier. A to-many hop yields a
/// list with one resolved value per related object.
pub(crate) fn resolve(store: &MemoryStore, object: &MemoryObject, key: &str) -> Value {
    if key.is_empty() {
        return Value::ObjectId(object.id());
    }

    let segments: Vec<&str> = key.split('.').collect();
    resolve_in(store, object.values(), &segments)
}

fn resolve_in(store: &MemoryStore, values: &Dictionary, segments: &[&str]) -> Value {
    let Some((first, rest)) = segments.split_first() else {
        return Value::Null;
    };
    let value = values.value(first);
    if rest.is_empty() {
        return value.clone();
    }

    match value {
        Value::ObjectId(id) => follow(store, *id, rest),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| match item {
                    Value::ObjectId(id) => follow(store, *id, rest),
                    _ => Value::Null,
                })
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn follow(store: &MemoryStore, id: u64, rest: &[&str]) -> Value {
    store
        .object(id)
        .map_or(Value::Null, |related| resolve_in(store, related.values(), rest))
}

/// Evaluate an expression against one object.
///
/// Functions over a to-many path aggregate the related values; over a scalar
/// they aggregate that single value.
pub(crate) fn evaluate(
    store: &MemoryStore,
    object: &MemoryObject,
    expression: &Expression,
) -> Value {
    match expression {
        Expression::KeyPath(key) => resolve(store, object, key),
        Expression::Constant(value) => value.clone(),
        Expression::Aggregate(items) => Value::List(
            items
                .iter()
                .map(|item| evaluate(store, object, item))
                .collect(),
        ),
        Expression::Function {
            function,
            arguments,
        } => {
            let Some(argument) = arguments.first() else {
                return Value::Null;
            };
            match evaluate(store, object, argument) {
                Value::List(items) => aggregate(*function, items),
                single => aggregate(*function, vec![single]),
            }
        }
    }
}

/// Fold a set of values with an aggregate function. Nulls are skipped.
pub(crate) fn aggregate(function: Function, values: Vec<Value>) -> Value {
    let values: Vec<Value> = values.into_iter().filter(|v| !v.is_null()).collect();

    match function {
        Function::Count => Value::Int(i64::try_from(values.len()).unwrap_or(i64::MAX)),
        Function::Sum => sum(&values),
        Function::Average => average(&values),
        Function::Min => values.into_iter().min_by(canonical_cmp).unwrap_or(Value::Null),
        Function::Max => values.into_iter().max_by(canonical_cmp).unwrap_or(Value::Null),
    }
}

#[expect(clippy::cast_precision_loss)]
fn sum(values: &[Value]) -> Value {
    let mut integral: i128 = 0;
    let mut float = 0.0_f64;
    let mut saw_float = false;

    for value in values {
        match value {
            Value::Int(v) => integral += i128::from(*v),
            Value::Uint(v) => integral += i128::from(*v),
            Value::Float(v) => {
                float += v;
                saw_float = true;
            }
            _ => {}
        }
    }

    match i64::try_from(integral) {
        Ok(total) if !saw_float => Value::Int(total),
        _ => Value::Float(float + integral as f64),
    }
}

#[expect(clippy::cast_precision_loss)]
fn average(values: &[Value]) -> Value {
    let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if numbers.is_empty() {
        return Value::Null;
    }

    Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

// ----------------------------------------------------------------------
// Predicates
// ----------------------------------------------------------------------

///
/// TextPattern
///

#[derive(Debug)]
pub(crate) enum TextPattern {
    Glob(Pattern),
    Regex(Regex),
}

impl TextPattern {
    fn compile(
        op: CompareOp,
        source: &str,
        options: ComparisonOptions,
    ) -> Result<Self, BackendError> {
        match op {
            CompareOp::Like => Pattern::new(&like_glob(&fold_text(source, options)))
                .map(Self::Glob)
                .map_err(|err| {
                    BackendError::invalid_request(format!("invalid LIKE pattern '{source}': {err}"))
                }),
            _ => RegexBuilder::new(&format!(
                "^(?:{})$",
                fold_text(source, options - ComparisonOptions::CASE_INSENSITIVE)
            ))
            .case_insensitive(options.contains(ComparisonOptions::CASE_INSENSITIVE))
            .build()
            .map(Self::Regex)
            .map_err(|err| {
                BackendError::invalid_request(format!("invalid MATCHES pattern '{source}': {err}"))
            }),
        }
    }

    fn is_match(&self, text: &str, options: ComparisonOptions) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches_with(
                &fold_text(text, options),
                MatchOptions {
                    case_sensitive: true,
                    require_literal_separator: false,
                    require_literal_leading_dot: false,
                },
            ),
            Self::Regex(regex) => {
                regex.is_match(&fold_text(text, options - ComparisonOptions::CASE_INSENSITIVE))
            }
        }
    }
}

// LIKE wildcards are `*` and `?` only; every other character matches itself.
fn like_glob(source: &str) -> String {
    let mut glob = String::with_capacity(source.len());
    let mut literal = String::new();

    for ch in source.chars() {
        if matches!(ch, '*' | '?') {
            glob.push_str(&Pattern::escape(&literal));
            literal.clear();
            glob.push(ch);
        } else {
            literal.push(ch);
        }
    }
    glob.push_str(&Pattern::escape(&literal));

    glob
}

///
/// Filter
///
/// Predicate prepared for repeated evaluation. Constant LIKE / MATCHES
/// patterns are compiled once, so a malformed pattern fails translation.
///

#[derive(Debug)]
pub(crate) enum Filter {
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        comparison: ComparisonPredicate,
        pattern: Option<TextPattern>,
    },
}

impl Filter {
    pub(crate) fn compile(predicate: &Predicate) -> Result<Self, BackendError> {
        Ok(match predicate {
            Predicate::True => Self::True,
            Predicate::False => Self::False,
            Predicate::And(preds) => {
                Self::And(preds.iter().map(Self::compile).collect::<Result<_, _>>()?)
            }
            Predicate::Or(preds) => {
                Self::Or(preds.iter().map(Self::compile).collect::<Result<_, _>>()?)
            }
            Predicate::Not(pred) => Self::Not(Box::new(Self::compile(pred)?)),
            Predicate::Compare(cmp) => {
                let pattern = match (cmp.op, &cmp.right) {
                    (
                        CompareOp::Like | CompareOp::Matches,
                        Expression::Constant(Value::Text(source)),
                    ) => Some(TextPattern::compile(cmp.op, source, cmp.options)?),
                    _ => None,
                };

                Self::Compare {
                    comparison: cmp.clone(),
                    pattern,
                }
            }
        })
    }

    pub(crate) fn matches(
        &self,
        store: &MemoryStore,
        object: &MemoryObject,
    ) -> Result<bool, BackendError> {
        match self {
            Self::True => Ok(true),
            Self::False => Ok(false),
            Self::And(filters) => {
                for filter in filters {
                    if !filter.matches(store, object)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(filters) => {
                for filter in filters {
                    if filter.matches(store, object)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(filter) => Ok(!filter.matches(store, object)?),
            Self::Compare {
                comparison,
                pattern,
            } => {
                let left = evaluate(store, object, &comparison.left);
                let right = evaluate(store, object, &comparison.right);

                compare(&left, comparison.op, &right, comparison.options, pattern.as_ref())
            }
        }
    }
}

fn compare(
    left: &Value,
    op: CompareOp,
    right: &Value,
    options: ComparisonOptions,
    pattern: Option<&TextPattern>,
) -> Result<bool, BackendError> {
    let ordered =
        |accept: fn(Ordering) -> bool| ordering(left, right, options).is_some_and(accept);

    Ok(match op {
        CompareOp::Eq => equal(left, right, options),
        CompareOp::Ne => !equal(left, right, options),
        CompareOp::Lt => ordered(Ordering::is_lt),
        CompareOp::Lte => ordered(Ordering::is_le),
        CompareOp::Gt => ordered(Ordering::is_gt),
        CompareOp::Gte => ordered(Ordering::is_ge),
        CompareOp::In => match (left, right) {
            (_, Value::List(items)) => items.iter().any(|item| equal(left, item, options)),
            (Value::Text(needle), Value::Text(haystack)) => {
                fold_text(haystack, options).contains(fold_text(needle, options).as_ref())
            }
            _ => false,
        },
        CompareOp::Contains => match (left, right) {
            (Value::Text(haystack), Value::Text(needle)) => {
                fold_text(haystack, options).contains(fold_text(needle, options).as_ref())
            }
            (Value::List(items), _) => items.iter().any(|item| equal(item, right, options)),
            _ => false,
        },
        CompareOp::BeginsWith => text_pair(left, right, options)
            .is_some_and(|(text, prefix)| text.starts_with(prefix.as_ref())),
        CompareOp::EndsWith => text_pair(left, right, options)
            .is_some_and(|(text, suffix)| text.ends_with(suffix.as_ref())),
        CompareOp::Like | CompareOp::Matches => {
            let (Value::Text(text), Value::Text(source)) = (left, right) else {
                return Ok(false);
            };
            match pattern {
                Some(pattern) => pattern.is_match(text, options),
                None => TextPattern::compile(op, source, options)?.is_match(text, options),
            }
        }
    })
}

fn text_pair<'v>(
    left: &'v Value,
    right: &'v Value,
    options: ComparisonOptions,
) -> Option<(Cow<'v, str>, Cow<'v, str>)> {
    match (left, right) {
        (Value::Text(l), Value::Text(r)) => Some((fold_text(l, options), fold_text(r, options))),
        _ => None,
    }
}

fn equal(left: &Value, right: &Value, options: ComparisonOptions) -> bool {
    match (left, right) {
        (Value::Text(l), Value::Text(r)) => fold_text(l, options) == fold_text(r, options),
        _ if left.is_numeric() && right.is_numeric() => {
            numeric_cmp(left, right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value, options: ComparisonOptions) -> Option<Ordering> {
    match (left, right) {
        (Value::Text(l), Value::Text(r)) => {
            Some(fold_text(l, options).cmp(&fold_text(r, options)))
        }
        _ => strict_ordering(left, right),
    }
}
