use crate::domain::ports::{Filter, Gateway, Query, Table};
use crate::utils::error::{Result, RosterError, UNIQUE_VIOLATION_CODE};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredRow {
    seq: u64,
    data: Map<String, Value>,
}

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<Table, Vec<StoredRow>>,
    next_seq: u64,
    failures: VecDeque<RosterError>,
    latency: Option<Duration>,
}

/// In-process gateway with the same contract as the remote service.
///
/// Ids are v4 UUIDs, timestamps are assigned on insert, `students` enforces
/// a unique `(class_id, email)` pair and batches are validated as a whole
/// before any row is written. Failures can be queued with [`fail_next`].
///
/// [`fail_next`]: MemoryGateway::fail_next
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next gateway call fails with `err` instead of touching any table.
    pub async fn fail_next(&self, err: RosterError) {
        self.inner.lock().await.failures.push_back(err);
    }

    /// Every call sleeps this long before answering.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().await.latency = latency;
    }

    /// Inserts a raw row as-is, bypassing id/timestamp assignment and constraints.
    pub async fn seed(&self, table: Table, row: Value) -> Result<()> {
        let data = into_object(row)?;
        let mut tables = self.inner.lock().await;
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables
            .rows
            .entry(table)
            .or_default()
            .push(StoredRow { seq, data });
        Ok(())
    }

    pub async fn row_count(&self, table: Table) -> usize {
        let tables = self.inner.lock().await;
        tables.rows.get(&table).map_or(0, Vec::len)
    }

    async fn begin(&self) -> Result<()> {
        let latency = {
            let mut tables = self.inner.lock().await;
            if let Some(err) = tables.failures.pop_front() {
                return Err(err);
            }
            tables.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    async fn insert_rows(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            prepared.push(into_object(row)?);
        }

        let mut tables = self.inner.lock().await;
        if table == Table::Students {
            check_unique_emails(tables.rows.get(&table).map(Vec::as_slice).unwrap_or(&[]), &prepared)?;
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut inserted = Vec::with_capacity(prepared.len());
        for mut data in prepared {
            data.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
            data.insert("created_at".to_string(), Value::String(now.clone()));
            data.insert("updated_at".to_string(), Value::String(now.clone()));
            let seq = tables.next_seq;
            tables.next_seq += 1;
            inserted.push(Value::Object(data.clone()));
            tables.rows.entry(table).or_default().push(StoredRow { seq, data });
        }
        Ok(inserted)
    }
}

fn into_object(row: Value) -> Result<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(RosterError::GatewayError {
            message: format!("expected a JSON object row, got {}", other),
            code: Some("PGRST102".to_string()),
        }),
    }
}

fn email_key(row: &Map<String, Value>) -> Option<(String, String)> {
    let class_id = row.get("class_id")?.as_str()?;
    let email = row.get("email")?.as_str()?;
    Some((class_id.to_string(), email.to_string()))
}

fn check_unique_emails(existing: &[StoredRow], incoming: &[Map<String, Value>]) -> Result<()> {
    let mut seen: HashSet<(String, String)> =
        existing.iter().filter_map(|row| email_key(&row.data)).collect();

    for row in incoming {
        if let Some(key) = email_key(row) {
            if !seen.insert(key.clone()) {
                return Err(RosterError::from_gateway(
                    Some(UNIQUE_VIOLATION_CODE.to_string()),
                    format!(
                        "duplicate key value violates unique constraint \"students_class_id_email_key\": (class_id, email)=({}, {}) already exists",
                        key.0, key.1
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn column_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(row: &Map<String, Value>, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => row
            .get(column)
            .filter(|v| !v.is_null())
            .is_some_and(|v| column_text(v) == *value),
        Filter::IsNull { column } => row.get(column).map_or(true, Value::is_null),
    }
}

fn compare_column(a: &StoredRow, b: &StoredRow, column: &str) -> Ordering {
    let left = a.data.get(column).filter(|v| !v.is_null());
    let right = b.data.get(column).filter(|v| !v.is_null());
    match (left, right) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => {
            let (x, y) = (column_text(x), column_text(y));
            match (DateTime::parse_from_rfc3339(&x), DateTime::parse_from_rfc3339(&y)) {
                (Ok(left), Ok(right)) => left.cmp(&right),
                _ => x.cmp(&y),
            }
        }
        // nulls sort last ascending
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R> {
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select<R>(&self, table: Table, query: &Query) -> Result<Vec<R>>
    where
        R: DeserializeOwned + Send,
    {
        self.begin().await?;
        let mut rows: Vec<StoredRow> = {
            let tables = self.inner.lock().await;
            tables
                .rows
                .get(&table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| query.filters.iter().all(|f| matches(&row.data, f)))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_column(a, b, &order.column).then(a.seq.cmp(&b.seq));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        rows.into_iter()
            .map(|row| decode(Value::Object(row.data)))
            .collect()
    }

    async fn insert_one<I, R>(&self, table: Table, row: &I) -> Result<R>
    where
        I: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        self.begin().await?;
        let value = serde_json::to_value(row)?;
        let mut inserted = self.insert_rows(table, vec![value]).await?;
        match inserted.pop() {
            Some(value) => decode(value),
            None => Err(RosterError::GatewayError {
                message: "insert returned no row".to_string(),
                code: None,
            }),
        }
    }

    async fn insert_many<I, R>(&self, table: Table, rows: &[I]) -> Result<Vec<R>>
    where
        I: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        self.begin().await?;
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let inserted = self.insert_rows(table, values).await?;
        inserted.into_iter().map(decode).collect()
    }

    async fn delete_by_id(&self, table: Table, id: &str) -> Result<()> {
        self.begin().await?;
        let mut tables = self.inner.lock().await;
        if let Some(rows) = tables.rows.get_mut(&table) {
            rows.retain(|row| row.data.get("id").and_then(Value::as_str) != Some(id));
        }
        Ok(())
    }
}
