//! Column layout of each collection table.

use crate::store::Collection;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    /// JSON document stored as TEXT
    Json,
}

/// A table column.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Server-managed columns (`id`, `created_at`) are never written by clients
    pub writable: bool,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column {
        name,
        kind,
        writable: true,
    }
}

const ID: Column = Column {
    name: "id",
    kind: ColumnKind::Integer,
    writable: false,
};

const CREATED_AT: Column = Column {
    name: "created_at",
    kind: ColumnKind::Text,
    writable: false,
};

use ColumnKind::{Integer, Json, Text};

/// Table name and columns, in SELECT order.
#[derive(Debug)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

static DOCTORS: TableSpec = TableSpec {
    name: "doctors",
    columns: &[
        ID,
        col("first_name", Text),
        col("last_name", Text),
        col("license_number", Text),
        col("specialty", Text),
        col("phone", Text),
        col("email", Text),
        CREATED_AT,
    ],
};

static PATIENTS: TableSpec = TableSpec {
    name: "patients",
    columns: &[
        ID,
        col("first_name", Text),
        col("last_name", Text),
        col("document_number", Text),
        col("birth_date", Text),
        col("phone", Text),
        col("email", Text),
        col("address", Text),
        col("social_work", Text),
        col("affiliation_number", Text),
        col("notes", Text),
        CREATED_AT,
    ],
};

static PRACTICES: TableSpec = TableSpec {
    name: "practices",
    columns: &[
        ID,
        col("code", Text),
        col("name", Text),
        col("description", Text),
        CREATED_AT,
    ],
};

static SOCIAL_WORKS: TableSpec = TableSpec {
    name: "social_works",
    columns: &[ID, col("name", Text), col("code", Text), CREATED_AT],
};

static SOCIAL_WORK_PLANS: TableSpec = TableSpec {
    name: "social_work_plans",
    columns: &[
        ID,
        col("social_work_id", Integer),
        col("name", Text),
        CREATED_AT,
    ],
};

static PRESCRIPTIONS: TableSpec = TableSpec {
    name: "prescriptions",
    columns: &[
        ID,
        col("patient_id", Integer),
        col("doctor_id", Integer),
        col("social_work_plan_id", Integer),
        col("issued_on", Text),
        col("diagnosis", Text),
        col("notes", Text),
        col("items", Json),
        CREATED_AT,
    ],
};

/// Table layout backing a collection.
pub fn table_for(collection: Collection) -> &'static TableSpec {
    match collection {
        Collection::Doctors => &DOCTORS,
        Collection::Patients => &PATIENTS,
        Collection::Practices => &PRACTICES,
        Collection::SocialWorks => &SOCIAL_WORKS,
        Collection::SocialWorkPlans => &SOCIAL_WORK_PLANS,
        Collection::Prescriptions => &PRESCRIPTIONS,
    }
}
