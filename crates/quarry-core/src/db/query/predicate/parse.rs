//! Module: query::predicate::parse
//! Responsibility: predicate-format text to `Predicate`, with positional arguments.
//! Does not own: rendering (see `Display` on `Predicate`) or evaluation.
//! Boundary: accepts everything `Display` writes, plus `%@` and `%K` placeholders.

use crate::{
    db::query::{
        expr::{Expression, Function},
        predicate::{CompareOp, ComparisonOptions, ComparisonPredicate, Predicate},
    },
    error::PredicateFormatError,
    value::Value,
};
use chumsky::{extra, prelude::*};

type Extra<'src> = extra::Err<Rich<'src, char>>;

// Words that never parse as a key path.
const RESERVED: &[&str] = &[
    "AND",
    "BEGINSWITH",
    "CONTAINS",
    "ENDSWITH",
    "FALSE",
    "FALSEPREDICATE",
    "IN",
    "LIKE",
    "MATCHES",
    "NIL",
    "NO",
    "NOT",
    "NULL",
    "OR",
    "SELF",
    "TRUE",
    "TRUEPREDICATE",
    "YES",
];

/// Parse predicate-format text, substituting positional arguments.
///
/// `%@` takes the next argument as a constant. `%K` takes the next argument
/// as a key path and requires text. Every argument must be consumed.
pub(crate) fn parse(
    format: &str,
    arguments: Vec<Value>,
) -> Result<Predicate, PredicateFormatError> {
    let node = predicate()
        .padded()
        .then_ignore(end())
        .parse(format)
        .into_result()
        .map_err(|errors| syntax_error(&errors))?;

    let mut arguments = Arguments::new(arguments);
    let predicate = node.resolve(&mut arguments)?;
    arguments.finish()?;

    Ok(predicate)
}

fn syntax_error(errors: &[Rich<'_, char>]) -> PredicateFormatError {
    let Some(error) = errors.first() else {
        return PredicateFormatError::Syntax {
            position: 0,
            message: "unrecognized input".to_string(),
        };
    };
    let found = error
        .found()
        .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));

    PredicateFormatError::Syntax {
        position: error.span().start,
        message: format!("{} (found {found})", error.reason()),
    }
}

// ----------------------------------------------------------------------
// Parsed tree
// ----------------------------------------------------------------------

///
/// Term
///
/// Expression as written, before placeholders are bound.
///

#[derive(Clone, Debug)]
enum Term {
    KeyPath(String),
    Constant(Value),
    ValueArgument,
    KeyArgument,
    Aggregate(Vec<Self>),
    Function(Function, Vec<Self>),
}

impl Term {
    fn resolve(self, arguments: &mut Arguments) -> Result<Expression, PredicateFormatError> {
        Ok(match self {
            Self::KeyPath(key) => Expression::KeyPath(key),
            Self::Constant(value) => Expression::Constant(value),
            Self::ValueArgument => Expression::Constant(arguments.take()?),
            Self::KeyArgument => {
                let index = arguments.consumed;
                match arguments.take()? {
                    Value::Text(key) => Expression::KeyPath(key),
                    other => {
                        return Err(PredicateFormatError::KeyArgument {
                            index,
                            found: other.kind_name(),
                        });
                    }
                }
            }
            Self::Aggregate(items) => Expression::Aggregate(resolve_terms(items, arguments)?),
            Self::Function(function, items) => Expression::Function {
                function,
                arguments: resolve_terms(items, arguments)?,
            },
        })
    }
}

fn resolve_terms(
    terms: Vec<Term>,
    arguments: &mut Arguments,
) -> Result<Vec<Expression>, PredicateFormatError> {
    terms
        .into_iter()
        .map(|term| term.resolve(arguments))
        .collect()
}

///
/// Node
///

#[derive(Clone, Debug)]
enum Node {
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        left: Term,
        op: CompareOp,
        options: ComparisonOptions,
        right: Term,
    },
}

impl Node {
    // One member stays bare; `(a) AND (b)` and `a` both read back as written.
    fn compound(mut nodes: Vec<Self>, build: fn(Vec<Self>) -> Self) -> Self {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            build(nodes)
        }
    }

    fn resolve(self, arguments: &mut Arguments) -> Result<Predicate, PredicateFormatError> {
        Ok(match self {
            Self::True => Predicate::True,
            Self::False => Predicate::False,
            Self::And(nodes) => Predicate::And(resolve_nodes(nodes, arguments)?),
            Self::Or(nodes) => Predicate::Or(resolve_nodes(nodes, arguments)?),
            Self::Not(node) => Predicate::Not(Box::new(node.resolve(arguments)?)),
            Self::Compare {
                left,
                op,
                options,
                right,
            } => {
                let left = left.resolve(arguments)?;
                let right = right.resolve(arguments)?;

                ComparisonPredicate::new(left, op, right)
                    .options(options)
                    .into()
            }
        })
    }
}

fn resolve_nodes(
    nodes: Vec<Node>,
    arguments: &mut Arguments,
) -> Result<Vec<Predicate>, PredicateFormatError> {
    nodes
        .into_iter()
        .map(|node| node.resolve(arguments))
        .collect()
}

///
/// Arguments
///
/// Positional arguments, consumed left to right as placeholders resolve.
///

struct Arguments {
    values: std::vec::IntoIter<Value>,
    consumed: usize,
    given: usize,
}

impl Arguments {
    fn new(values: Vec<Value>) -> Self {
        Self {
            given: values.len(),
            values: values.into_iter(),
            consumed: 0,
        }
    }

    fn take(&mut self) -> Result<Value, PredicateFormatError> {
        let value = self
            .values
            .next()
            .ok_or(PredicateFormatError::MissingArgument {
                index: self.consumed,
                given: self.given,
            })?;
        self.consumed += 1;

        Ok(value)
    }

    const fn finish(&self) -> Result<(), PredicateFormatError> {
        if self.consumed < self.given {
            return Err(PredicateFormatError::UnusedArguments {
                used: self.consumed,
                given: self.given,
            });
        }

        Ok(())
    }
}

// ----------------------------------------------------------------------
// Grammar
// ----------------------------------------------------------------------

fn predicate<'src>() -> impl Parser<'src, &'src str, Node, Extra<'src>> + Clone {
    recursive(|predicate| {
        let group = predicate.delimited_by(just('(').padded(), just(')').padded());

        let constant = choice((
            kw("TRUEPREDICATE").to(Node::True),
            kw("FALSEPREDICATE").to(Node::False),
        ));

        let comparison = term()
            .then(operator())
            .then(modifier().or_not())
            .then(term())
            .map(|(((left, op), options), right)| Node::Compare {
                left,
                op,
                options: options.unwrap_or_default(),
                right,
            })
            .labelled("comparison like name == \"value\"");

        let negation = choice((kw("NOT"), just('!').padded().ignored()));
        let unary = negation
            .repeated()
            .collect::<Vec<_>>()
            .then(choice((group, constant, comparison)))
            .map(|(negations, node)| {
                negations
                    .into_iter()
                    .fold(node, |node, ()| Node::Not(Box::new(node)))
            });

        let conjunction = unary
            .separated_by(choice((kw("AND"), just("&&").padded().ignored())))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|nodes| Node::compound(nodes, Node::And));

        conjunction
            .separated_by(choice((kw("OR"), just("||").padded().ignored())))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|nodes| Node::compound(nodes, Node::Or))
    })
}

fn term<'src>() -> impl Parser<'src, &'src str, Term, Extra<'src>> + Clone {
    recursive(|term| {
        let list = term
            .separated_by(just(',').padded())
            .allow_trailing()
            .collect::<Vec<_>>();

        let aggregate = list
            .clone()
            .delimited_by(just('{').padded(), just('}').padded())
            .map(Term::Aggregate);

        let function = word()
            .try_map(|name: &str, span| {
                function_named(name)
                    .ok_or_else(|| Rich::custom(span, format!("unknown function '{name}'")))
            })
            .then_ignore(just(':'))
            .then(list.delimited_by(just('(').padded(), just(')').padded()))
            .map(|(function, arguments)| Term::Function(function, arguments));

        choice((
            just("%@").to(Term::ValueArgument),
            just("%K").to(Term::KeyArgument),
            literal().map(Term::Constant),
            aggregate,
            function,
            kw("SELF").to(Term::KeyPath(String::new())),
            key_path().map(Term::KeyPath),
        ))
        .padded()
        .labelled("expression")
    })
}

fn operator<'src>() -> impl Parser<'src, &'src str, CompareOp, Extra<'src>> + Clone {
    let symbol = choice((
        just("==").to(CompareOp::Eq),
        just("!=").to(CompareOp::Ne),
        just("<>").to(CompareOp::Ne),
        just("<=").to(CompareOp::Lte),
        just("=<").to(CompareOp::Lte),
        just(">=").to(CompareOp::Gte),
        just("=>").to(CompareOp::Gte),
        just('=').to(CompareOp::Eq),
        just('<').to(CompareOp::Lt),
        just('>').to(CompareOp::Gt),
    ));

    let keyword = choice((
        kw("IN").to(CompareOp::In),
        kw("CONTAINS").to(CompareOp::Contains),
        kw("BEGINSWITH").to(CompareOp::BeginsWith),
        kw("ENDSWITH").to(CompareOp::EndsWith),
        kw("LIKE").to(CompareOp::Like),
        kw("MATCHES").to(CompareOp::Matches),
    ));

    choice((symbol, keyword))
        .padded()
        .labelled("comparison operator")
}

// `[cdn]` suffix written straight after the operator.
fn modifier<'src>() -> impl Parser<'src, &'src str, ComparisonOptions, Extra<'src>> + Clone {
    just('[')
        .ignore_then(one_of("cdn").repeated().to_slice())
        .then_ignore(just(']'))
        .padded()
        .map(|flags: &str| flags.chars().map(option_flag).collect())
        .labelled("comparison modifier like [cd]")
}

fn literal<'src>() -> impl Parser<'src, &'src str, Value, Extra<'src>> + Clone {
    let digits = || {
        any()
            .filter(|c: &char| c.is_ascii_digit())
            .repeated()
            .at_least(1)
    };

    let number = just('-')
        .or_not()
        .then(digits())
        .then(just('.').then(digits()).or_not())
        .then(one_of("eE").then(one_of("+-").or_not()).then(digits()).or_not())
        .to_slice()
        .try_map(|text: &str, span| {
            parse_number(text)
                .ok_or_else(|| Rich::custom(span, format!("number '{text}' is out of range")))
        });

    let object_id = just("<x-object/")
        .ignore_then(digits().to_slice())
        .then_ignore(just('>'))
        .try_map(|text: &str, span| {
            text.parse()
                .map(Value::ObjectId)
                .map_err(|_| Rich::custom(span, "object id is out of range"))
        });

    let blob = just('<')
        .ignore_then(any().filter(char::is_ascii_hexdigit).repeated().to_slice())
        .then_ignore(just('>'))
        .try_map(|hex: &str, span| {
            decode_hex(hex)
                .map(Value::Blob)
                .ok_or_else(|| Rich::custom(span, "blob needs an even number of hex digits"))
        });

    let text = quoted('"', "\"\\")
        .or(quoted('\'', "'\\"))
        .map(Value::Text);

    let keyword = choice((
        kw("YES").to(Value::Bool(true)),
        kw("TRUE").to(Value::Bool(true)),
        kw("NO").to(Value::Bool(false)),
        kw("FALSE").to(Value::Bool(false)),
        kw("NIL").to(Value::Null),
        kw("NULL").to(Value::Null),
    ));

    choice((text, number, object_id, blob, keyword)).labelled("literal")
}

fn quoted<'src>(
    quote: char,
    stop: &'static str,
) -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escape = just('\\').ignore_then(choice((
        just('\\'),
        just('"'),
        just('\''),
        just('n').to('\n'),
        just('t').to('\t'),
    )));

    just(quote)
        .ignore_then(none_of(stop).or(escape).repeated().collect::<Vec<char>>())
        .then_ignore(just(quote))
        .map(|chars| chars.into_iter().collect())
        .labelled("quoted string")
}

fn key_path<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    word()
        .separated_by(just('.'))
        .at_least(1)
        .collect::<Vec<_>>()
        .try_map(|segments: Vec<&str>, span| {
            let numeric = segments
                .iter()
                .any(|segment| segment.starts_with(|c: char| c.is_ascii_digit()));
            let reserved = matches!(segments.as_slice(), [only] if is_reserved(only));

            let key = segments.join(".");
            if numeric || reserved {
                return Err(Rich::custom(span, format!("'{key}' is not a key path")));
            }

            Ok(key)
        })
        .labelled("key path")
}

fn word<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice()
}

// Case-insensitive keyword.
fn kw<'src>(keyword: &'static str) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    word()
        .try_map(move |found: &str, span| {
            if found.eq_ignore_ascii_case(keyword) {
                Ok(())
            } else {
                Err(Rich::custom(span, format!("expected keyword '{keyword}'")))
            }
        })
        .padded()
}

// ----------------------------------------------------------------------
// Literal helpers
// ----------------------------------------------------------------------

fn is_reserved(word: &str) -> bool {
    RESERVED
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}

fn function_named(name: &str) -> Option<Function> {
    [
        Function::Sum,
        Function::Average,
        Function::Min,
        Function::Max,
        Function::Count,
    ]
    .into_iter()
    .find(|function| {
        function
            .selector()
            .trim_end_matches(':')
            .eq_ignore_ascii_case(name)
    })
}

const fn option_flag(flag: char) -> ComparisonOptions {
    match flag {
        'c' => ComparisonOptions::CASE_INSENSITIVE,
        'd' => ComparisonOptions::DIACRITIC_INSENSITIVE,
        _ => ComparisonOptions::NORMALIZED,
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if text.contains(['.', 'e', 'E']) {
        return text.parse().ok().map(Value::Float);
    }

    text.parse()
        .map(Value::Int)
        .ok()
        .or_else(|| text.parse().ok().map(Value::Uint))
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if !hex.len().is_multiple_of(2) {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}
