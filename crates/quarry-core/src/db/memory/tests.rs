use super::*;
use crate::{
    db::{
        query::{
            AttributeType, ComparisonOptions, ExpressionConvertible, ExpressionDescription,
            Predicate,
        },
        session::Session,
    },
    error::{ErrorClass, PredicateFormatError, QueryError},
    test_fixtures::{Department, EMPLOYEES, Employee, seeded_backend, seeded_context},
    traits::Entity,
};

fn session() -> (Session<MemoryBackend>, MemoryContext) {
    let (backend, context) = seeded_backend();

    (Session::new(backend), context)
}

fn names(objects: &[MemoryObject]) -> Vec<String> {
    objects
        .iter()
        .map(|object| {
            format!(
                "{} {}",
                object.get_as::<String>("firstName").unwrap_or_default(),
                object.get_as::<String>("lastName").unwrap_or_default()
            )
        })
        .collect()
}

// ----------------------------------------------------------------------
// Filtering
// ----------------------------------------------------------------------

#[test]
fn unfiltered_fetch_returns_insertion_order() {
    let (session, context) = session();
    let rows = session.query::<Employee>().all(&context).unwrap();

    assert_eq!(rows.len(), EMPLOYEES.len());
    assert_eq!(names(&rows)[0], "David Smith");
    assert_eq!(names(&rows)[5], "Eve Ng");
}

#[test]
fn filter_follows_to_one_relationship() {
    let (session, context) = session();
    let e = Employee::attribute();

    let rows = session
        .query::<Employee>()
        .filter(e.department().name().equal_to("Accounting"))
        .all(&context)
        .unwrap();

    assert_eq!(names(&rows), ["Zoë Möller", "Bob Brown"]);
}

#[test]
fn numeric_comparisons_widen_across_kinds() {
    let (session, context) = session();
    let salary = Employee::attribute().salary();

    let above = session
        .query::<Employee>()
        .filter(salary.greater_than(90_000.5))
        .count(&context)
        .unwrap();
    let exact = session
        .query::<Employee>()
        .filter(salary.equal_to(90_000_u64))
        .count(&context)
        .unwrap();

    assert_eq!(above, 2);
    assert_eq!(exact, 1);
}

#[test]
fn null_attributes_match_only_null_comparisons() {
    let (session, context) = session();
    let nick = Employee::attribute().nick_name();

    let without = session
        .query::<Employee>()
        .filter(nick.equal_to(None::<String>))
        .count(&context)
        .unwrap();
    let ordered = session
        .query::<Employee>()
        .filter(nick.greater_than("A"))
        .count(&context)
        .unwrap();

    assert_eq!(without, 3);
    assert_eq!(ordered, 3);
}

#[test]
fn case_and_diacritic_options_fold_text() {
    let (session, context) = session();
    let last = Employee::attribute().last_name();

    let strict = session
        .query::<Employee>()
        .filter(last.equal_to("moller"))
        .count(&context)
        .unwrap();
    let folded = session
        .query::<Employee>()
        .filter(last.equal_to("moller").case_insensitive().diacritic_insensitive())
        .count(&context)
        .unwrap();

    assert_eq!(strict, 0);
    assert_eq!(folded, 1);
}

#[test]
fn string_operators_respect_options() {
    let (session, context) = session();
    let last = Employee::attribute().last_name();
    let count = |predicate: Predicate| {
        session
            .query::<Employee>()
            .filter(predicate)
            .count(&context)
            .unwrap()
    };

    assert_eq!(count(last.begins_with("Sm").into()), 2);
    assert_eq!(count(last.begins_with("sm").into()), 0);
    assert_eq!(count(last.begins_with("sm").case_insensitive().into()), 2);
    assert_eq!(count(last.ends_with("es").into()), 1);
    assert_eq!(count(last.contains("o").into()), 2);
}

#[test]
fn like_and_matches_use_whole_string_patterns() {
    let (session, context) = session();
    let first = Employee::attribute().first_name();
    let count = |predicate: Predicate| {
        session
            .query::<Employee>()
            .filter(predicate)
            .count(&context)
            .unwrap()
    };

    assert_eq!(count(first.like("A*").into()), 2);
    assert_eq!(count(first.like("?ve").into()), 1);
    assert_eq!(
        count(first.like("a*").options(ComparisonOptions::CASE_INSENSITIVE).into()),
        2
    );
    assert_eq!(count(first.matches("[A-D][a-z]{2,4}").into()), 4);
    assert_eq!(count(first.matches("Da").into()), 0);
}

#[test]
fn like_treats_brackets_as_literal_text() {
    let context = MemoryContext::with_entities([Employee::ENTITY_NAME]);
    for title in ["[draft] plan", "d", "[draft"] {
        context
            .insert(Employee::ENTITY_NAME, Dictionary::new().with("firstName", title))
            .unwrap();
    }
    let session = Session::new(MemoryBackend::new());
    let first = Employee::attribute().first_name();
    let titles = |predicate: Predicate| -> Vec<String> {
        session
            .query::<Employee>()
            .filter(predicate)
            .all(&context)
            .unwrap()
            .iter()
            .filter_map(|object| object.get_as::<String>("firstName"))
            .collect()
    };

    assert_eq!(titles(first.like("[draft]*").into()), ["[draft] plan"]);
    assert_eq!(titles(first.like("[draft*").into()), ["[draft] plan", "[draft"]);
    assert_eq!(titles(first.like("[?]*").into()), Vec::<String>::new());
    assert_eq!(titles(first.like("?").into()), ["d"]);
}

#[test]
fn format_filter_matches_the_built_predicate() {
    let (session, context) = session();
    let e = Employee::attribute();

    let formatted = session
        .query::<Employee>()
        .filter_format(
            "department.name == %@ AND salary > %@",
            [Value::from("Accounting"), 0.into()],
        )
        .unwrap()
        .all(&context)
        .unwrap();
    let built = session
        .query::<Employee>()
        .filter(e.department().name().equal_to("Accounting") & e.salary().greater_than(0))
        .all(&context)
        .unwrap();

    assert_eq!(names(&formatted), names(&built));
    assert_eq!(names(&formatted), ["Zoë Möller", "Bob Brown"]);
}

#[test]
fn format_filter_rejects_malformed_text_before_execution() {
    let (session, _context) = session();

    let err = session
        .query::<Employee>()
        .filter_format("department.name ==", Vec::<Value>::new())
        .err()
        .expect("text is incomplete");

    assert!(matches!(
        err,
        QueryError::PredicateFormat(PredicateFormatError::Syntax { .. })
    ));
}

#[test]
fn among_tests_membership() {
    let (session, context) = session();
    let e = Employee::attribute();

    let rows = session
        .query::<Employee>()
        .filter(e.first_name().among(["Eve", "Bob", "Nobody"]))
        .all(&context)
        .unwrap();

    assert_eq!(names(&rows), ["Bob Brown", "Eve Ng"]);
}

#[test]
fn compound_predicates_compose() {
    let (session, context) = session();
    let e = Employee::attribute();
    let sales = e.department().name().equal_to("Sales");

    let predicate = Predicate::or(vec![
        Predicate::and(vec![sales.into(), e.salary().less_than(80_000).into()]),
        Predicate::not(e.department().name().not_equal_to("Engineering")),
    ]);

    let rows = session
        .query::<Employee>()
        .filter(predicate)
        .all(&context)
        .unwrap();

    assert_eq!(names(&rows), ["Alice Smith", "Eve Ng"]);
}

#[test]
fn constant_predicates_short_circuit() {
    let (session, context) = session();

    assert_eq!(
        session.query::<Employee>().filter(false).count(&context).unwrap(),
        0
    );
    assert_eq!(
        session.query::<Employee>().filter(true).count(&context).unwrap(),
        6
    );
}

// ----------------------------------------------------------------------
// Ordering and paging
// ----------------------------------------------------------------------

#[test]
fn sort_descriptors_apply_in_call_order() {
    let (session, context) = session();
    let e = Employee::attribute();

    let rows = session
        .query::<Employee>()
        .filter(e.department().name().equal_to("Sales"))
        .order_by_desc(e.last_name())
        .order_by(e.first_name())
        .all(&context)
        .unwrap();

    assert_eq!(names(&rows), ["Alice Smith", "David Smith", "Amy Jones"]);
}

#[test]
fn sorting_by_relationship_key_path() {
    let (session, context) = session();
    let e = Employee::attribute();

    let rows = session
        .query::<Employee>()
        .order_by(e.department().name())
        .order_by_desc(e.salary())
        .all(&context)
        .unwrap();

    assert_eq!(
        names(&rows),
        [
            "Zoë Möller",
            "Bob Brown",
            "Eve Ng",
            "David Smith",
            "Amy Jones",
            "Alice Smith"
        ]
    );
}

#[test]
fn nulls_sort_first_ascending() {
    let (session, context) = session();
    let e = Employee::attribute();

    let first = session
        .query::<Employee>()
        .order_by(e.nick_name())
        .first(&context)
        .unwrap()
        .expect("non-empty");

    assert!(first.get("nickName").is_null());
}

#[test]
fn sorting_a_float_column_with_nan_is_total() {
    let context = MemoryContext::with_entities([Employee::ENTITY_NAME]);
    for salary in [f64::NAN, 3.5, -1.0, f64::NAN, 2.0] {
        context
            .insert(Employee::ENTITY_NAME, Dictionary::new().with("salary", salary))
            .unwrap();
    }
    let session = Session::new(MemoryBackend::new());
    let e = Employee::attribute();
    let salaries = |ascending: bool| -> Vec<f64> {
        session
            .query::<Employee>()
            .order(ascending, [e.salary()])
            .all(&context)
            .unwrap()
            .iter()
            .filter_map(|object| object.get("salary").as_f64())
            .collect()
    };

    let ascending = salaries(true);
    assert_eq!(ascending[..3], [-1.0, 2.0, 3.5]);
    assert!(ascending[3..].iter().all(|salary| salary.is_nan()));

    let descending = salaries(false);
    assert!(descending[..2].iter().all(|salary| salary.is_nan()));
    assert_eq!(descending[2..], [3.5, 2.0, -1.0]);
}

#[test]
fn offset_and_limit_page_sorted_rows() {
    let (session, context) = session();
    let e = Employee::attribute();
    let query = session.query::<Employee>().order_by(e.first_name());

    let page = query.clone().offset(1).limit(2).all(&context).unwrap();
    let second = query.clone().offset(1).first(&context).unwrap().expect("row");
    let beyond = query.clone().offset(10).all(&context).unwrap();

    assert_eq!(names(&page), ["Amy Jones", "Bob Brown"]);
    assert_eq!(second.get_as::<String>("firstName").as_deref(), Some("Amy"));
    assert!(beyond.is_empty());
}

#[test]
fn count_applies_paging() {
    let (session, context) = session();
    let query = session.query::<Employee>();

    assert_eq!(query.clone().offset(4).count(&context).unwrap(), 2);
    assert_eq!(query.clone().limit(3).count(&context).unwrap(), 3);
    assert_eq!(query.clone().offset(5).limit(3).count(&context).unwrap(), 1);
    assert_eq!(query.offset(9).count(&context).unwrap(), 0);
}

// ----------------------------------------------------------------------
// Shapes
// ----------------------------------------------------------------------

#[test]
fn ids_follow_request_order() {
    let (session, context) = session();
    let e = Employee::attribute();

    let ids = session
        .query::<Employee>()
        .order_by_desc(e.salary())
        .ids()
        .all(&context)
        .unwrap();

    let top = context.object(ids[0]).expect("stored");
    assert_eq!(ids.len(), 6);
    assert_eq!(top.get_as::<String>("firstName").as_deref(), Some("Eve"));
}

#[test]
fn projection_omits_null_columns() {
    let (session, context) = session();
    let e = Employee::attribute();

    let rows = session
        .query::<Employee>()
        .filter(e.last_name().equal_to("Jones"))
        .select([e.first_name(), e.nick_name()])
        .all(&context)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value("firstName"), &Value::from("Amy"));
    assert!(!rows[0].contains_key("nickName"));
}

#[test]
fn projection_without_properties_returns_all_values() {
    let (session, context) = session();
    let e = Employee::attribute();

    let row = session
        .query::<Employee>()
        .filter(e.first_name().equal_to("Eve"))
        .distinct(false)
        .first(&context)
        .unwrap()
        .expect("row");

    assert_eq!(row.value("salary"), &Value::Int(120_000));
    assert!(matches!(row.value("department"), Value::ObjectId(_)));
}

#[test]
fn distinct_removes_duplicate_rows() {
    let (session, context) = session();
    let e = Employee::attribute();
    let query = session
        .query::<Employee>()
        .select([e.department().name()])
        .distinct(true);

    let departments: Vec<String> = query.array(e.department().name(), &context).unwrap();

    assert_eq!(departments, ["Sales", "Accounting", "Engineering"]);
    assert_eq!(query.count(&context).unwrap(), 3);
}

#[test]
fn group_by_aggregates_per_group_in_first_appearance_order() {
    let (session, context) = session();
    let e = Employee::attribute();

    let rows = session
        .query::<Employee>()
        .select([e.department().name()])
        .select([
            ExpressionDescription::sum(e.salary(), Some("total")),
            ExpressionDescription::count(e.salary(), Some("headcount")),
        ])
        .group_by([e.department().name()])
        .all(&context)
        .unwrap();

    let totals: Vec<(Value, Value, Value)> = rows
        .iter()
        .map(|row| {
            (
                row.value("department.name").clone(),
                row.value("total").clone(),
                row.value("headcount").clone(),
            )
        })
        .collect();

    assert_eq!(
        totals,
        [
            (Value::from("Sales"), Value::Int(245_000), Value::Int(3)),
            (Value::from("Accounting"), Value::Int(155_000), Value::Int(2)),
            (Value::from("Engineering"), Value::Int(120_000), Value::Int(1)),
        ]
    );
}

#[test]
fn aggregate_without_group_by_yields_one_row() {
    let (session, context) = session();
    let e = Employee::attribute();

    let rows = session
        .query::<Employee>()
        .filter(e.department().name().equal_to("Accounting"))
        .select([
            ExpressionDescription::average(e.salary(), None),
            ExpressionDescription::min(e.first_name(), Some("first")),
            ExpressionDescription::max(e.salary(), Some("top")),
        ])
        .all(&context)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value("salary"), &Value::Float(77_500.0));
    assert_eq!(rows[0].value("first"), &Value::from("Bob"));
    assert_eq!(rows[0].value("top"), &Value::Int(95_000));
}

#[test]
fn aggregate_over_no_rows_keeps_count_and_sum() {
    let (session, context) = session();
    let e = Employee::attribute();

    let row = session
        .query::<Employee>()
        .filter(false)
        .select([
            ExpressionDescription::sum(e.salary(), Some("total")),
            ExpressionDescription::count(e.salary(), Some("n")),
            ExpressionDescription::average(e.salary(), Some("mean")),
        ])
        .first(&context)
        .unwrap()
        .expect("aggregate row");

    assert_eq!(row.value("total"), &Value::Int(0));
    assert_eq!(row.value("n"), &Value::Int(0));
    assert!(!row.contains_key("mean"));
}

#[test]
fn grouped_count_counts_groups() {
    let (session, context) = session();
    let e = Employee::attribute();

    let groups = session
        .query::<Employee>()
        .select([e.last_name()])
        .group_by([e.last_name()])
        .count(&context)
        .unwrap();

    assert_eq!(groups, 5);
}

#[test]
fn to_many_relationships_resolve_to_lists() {
    let context = MemoryContext::with_entities(["Team", "Member"]);
    let ada = context
        .insert("Member", Dictionary::new().with("name", "Ada").with("age", 36))
        .unwrap();
    let linus = context
        .insert("Member", Dictionary::new().with("name", "Linus").with("age", 28))
        .unwrap();
    context
        .insert(
            "Team",
            Dictionary::new()
                .with("title", "Kernel")
                .with("members", Value::List(vec![Value::ObjectId(ada), Value::ObjectId(linus)])),
        )
        .unwrap();
    context
        .insert(
            "Team",
            Dictionary::new()
                .with("title", "Empty")
                .with("members", Value::List(vec![])),
        )
        .unwrap();

    let backend = MemoryBackend::new();
    let request = |fetch: FetchRequest| backend.translate(&fetch, &context).unwrap();

    let mut by_member = FetchRequest::new("Team");
    by_member.predicate = Some(Expression::key_path("members.name").contains("Ada").into());
    assert_eq!(backend.count(&request(by_member), &context).unwrap(), 1);

    let oldest = ExpressionDescription::max_of(
        Expression::key_path("members.age"),
        "oldest",
        AttributeType::Integer64,
    );
    let mut per_team = FetchRequest::new("Team");
    per_team.result_type = ResultType::Dictionary;
    per_team.properties_to_fetch = Some(vec![
        Property::Attribute("title".into()),
        Property::Expression(oldest),
    ]);
    per_team.properties_to_group_by = Some(vec![Property::Attribute("title".into())]);

    let rows = backend.fetch(&request(per_team), &context).unwrap();
    let rows: Vec<Dictionary> = rows
        .into_iter()
        .filter_map(|row| match row {
            FetchRow::Dictionary(row) => Some(row),
            _ => None,
        })
        .collect();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].value("oldest"), &Value::Int(36));
    assert!(!rows[1].contains_key("oldest"));
}

// ----------------------------------------------------------------------
// Translation errors
// ----------------------------------------------------------------------

#[test]
fn unregistered_entity_is_an_invalid_request() {
    let backend = MemoryBackend::new();
    let context = MemoryContext::with_entities([Department::ENTITY_NAME]);

    let err = backend
        .translate(&FetchRequest::new(Employee::ENTITY_NAME), &context)
        .expect_err("employee not registered");

    assert_eq!(err.class, ErrorClass::InvalidRequest);
}

#[test]
fn group_by_on_object_results_is_rejected() {
    let backend = MemoryBackend::new();
    let context = seeded_context();
    let mut request = FetchRequest::new(Employee::ENTITY_NAME);
    request.properties_to_group_by = Some(vec![Property::Attribute("lastName".into())]);

    let err = backend
        .translate(&request, &context)
        .expect_err("objects cannot be grouped");

    assert_eq!(err.class, ErrorClass::InvalidRequest);
}

#[test]
fn malformed_constant_pattern_fails_translation() {
    let (session, context) = session();
    let first = Employee::attribute().first_name();

    let err = session
        .query::<Employee>()
        .filter(first.matches("(unclosed"))
        .request(&context)
        .expect_err("pattern does not compile");

    assert_eq!(err.backend_class(), Some(ErrorClass::InvalidRequest));
}

#[test]
fn count_result_type_is_not_fetchable() {
    let backend = MemoryBackend::new();
    let context = seeded_context();
    let mut request = FetchRequest::new(Employee::ENTITY_NAME);
    request.result_type = ResultType::Count;

    let native = backend.translate(&request, &context).unwrap();
    let err = backend.fetch(&native, &context).expect_err("count via fetch");

    assert_eq!(err.class, ErrorClass::Unsupported);
    assert_eq!(backend.count(&native, &context).unwrap(), 6);
}

#[test]
fn translated_request_keeps_the_fetch_request() {
    let backend = MemoryBackend::new();
    let context = seeded_context();
    let request = FetchRequest::new(Employee::ENTITY_NAME);

    let native = backend.translate(&request, &context).unwrap();

    assert_eq!(native.fetch_request(), &request);
}
