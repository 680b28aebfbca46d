use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Classes,
    Students,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Classes => "classes",
            Table::Students => "students",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    IsNull { column: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Row selection: every filter must hold, then rows are sorted by `order`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull {
            column: column.to_string(),
        });
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }
}

/// Request/response contract of the remote persistence service.
///
/// Implementations assign `id`, `created_at` and `updated_at` on insert,
/// treat `insert_many` as a single all-or-nothing write, and report a
/// uniqueness violation as [`RosterError::ConstraintViolation`].
///
/// [`RosterError::ConstraintViolation`]: crate::utils::error::RosterError::ConstraintViolation
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select<R>(&self, table: Table, query: &Query) -> Result<Vec<R>>
    where
        R: DeserializeOwned + Send;

    async fn insert_one<I, R>(&self, table: Table, row: &I) -> Result<R>
    where
        I: Serialize + Sync,
        R: DeserializeOwned + Send;

    async fn insert_many<I, R>(&self, table: Table, rows: &[I]) -> Result<Vec<R>>
    where
        I: Serialize + Sync,
        R: DeserializeOwned + Send;

    /// Deleting an id that does not exist is not an error.
    async fn delete_by_id(&self, table: Table, id: &str) -> Result<()>;
}
