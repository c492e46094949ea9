use crate::{
    db::memory::{MemoryBackend, MemoryContext},
    model::path::AttributePath,
    traits::{Entity, EntityAttribute},
    value::{Dictionary, Value},
};

///
/// Employee
///

pub(crate) struct Employee;

impl Entity for Employee {
    const ENTITY_NAME: &'static str = "Employee";

    type Attribute = EmployeeAttribute;
}

///
/// EmployeeAttribute
///

#[derive(Clone, Debug)]
pub(crate) struct EmployeeAttribute(AttributePath);

impl EntityAttribute for EmployeeAttribute {
    fn from_path(path: AttributePath) -> Self {
        Self(path)
    }

    fn path(&self) -> &AttributePath {
        &self.0
    }
}

impl EmployeeAttribute {
    pub(crate) fn first_name(&self) -> AttributePath {
        self.0.child("firstName")
    }

    pub(crate) fn last_name(&self) -> AttributePath {
        self.0.child("lastName")
    }

    pub(crate) fn nick_name(&self) -> AttributePath {
        self.0.child("nickName")
    }

    pub(crate) fn salary(&self) -> AttributePath {
        self.0.child("salary")
    }

    pub(crate) fn department(&self) -> DepartmentAttribute {
        DepartmentAttribute(self.0.child("department"))
    }
}

///
/// Department
///

pub(crate) struct Department;

impl Entity for Department {
    const ENTITY_NAME: &'static str = "Department";

    type Attribute = DepartmentAttribute;
}

///
/// DepartmentAttribute
///

#[derive(Clone, Debug)]
pub(crate) struct DepartmentAttribute(AttributePath);

impl EntityAttribute for DepartmentAttribute {
    fn from_path(path: AttributePath) -> Self {
        Self(path)
    }

    fn path(&self) -> &AttributePath {
        &self.0
    }
}

impl DepartmentAttribute {
    pub(crate) fn name(&self) -> AttributePath {
        self.0.child("name")
    }
}

/// Employees as (department, last name, first name, salary, nick name).
pub(crate) const EMPLOYEES: [(&str, &str, &str, i64, Option<&str>); 6] = [
    ("Sales", "Smith", "David", 90_000, Some("Dave")),
    ("Sales", "Jones", "Amy", 85_000, None),
    ("Sales", "Smith", "Alice", 70_000, Some("Al")),
    ("Accounting", "Möller", "Zoë", 95_000, None),
    ("Accounting", "Brown", "Bob", 60_000, Some("Bobby")),
    ("Engineering", "Ng", "Eve", 120_000, None),
];

/// Build a context holding the department and employee fixture rows.
pub(crate) fn seeded_context() -> MemoryContext {
    let context = MemoryContext::with_entities([Department::ENTITY_NAME, Employee::ENTITY_NAME]);
    let mut departments: Vec<(&str, u64)> = Vec::new();

    for (department, last, first, salary, nick) in EMPLOYEES {
        let department_id = match departments.iter().find(|(name, _)| *name == department) {
            Some((_, id)) => *id,
            None => {
                let id = context
                    .insert(
                        Department::ENTITY_NAME,
                        Dictionary::new().with("name", department),
                    )
                    .expect("department entity is registered");
                departments.push((department, id));
                id
            }
        };

        context
            .insert(
                Employee::ENTITY_NAME,
                Dictionary::new()
                    .with("firstName", first)
                    .with("lastName", last)
                    .with("salary", salary)
                    .with("nickName", nick)
                    .with("department", Value::ObjectId(department_id)),
            )
            .expect("employee entity is registered");
    }

    context
}

/// Backend whose default context is the seeded fixture store.
pub(crate) fn seeded_backend() -> (MemoryBackend, MemoryContext) {
    let context = seeded_context();

    (MemoryBackend::with_default(context.clone()), context)
}
