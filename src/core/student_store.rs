use crate::core::csv_import::{parse_roster_csv, CsvImport};
use crate::core::ops::StoreCore;
use crate::core::state::{Action, Placement, RosterState};
use crate::domain::model::{NewStudent, Student};
use crate::domain::ports::{Gateway, Query, Table};
use crate::utils::error::{Result, RosterError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How inserted students are placed in the local list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentOrdering {
    /// Appended to the end; the list is "name order at last fetch, then
    /// insertion order" until the next fetch.
    #[default]
    Appended,
    /// Placed at their name-sorted position so the fetch order is kept.
    SortedByName,
}

impl StudentOrdering {
    fn placement(self) -> Placement {
        match self {
            StudentOrdering::Appended => Placement::Back,
            StudentOrdering::SortedByName => Placement::ByName,
        }
    }
}

/// Outcome of a CSV import that reached the gateway.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub inserted: Vec<Student>,
    pub skipped_lines: Vec<u64>,
}

/// Students of one class.
pub struct StudentStore<G: Gateway> {
    gateway: Arc<G>,
    class_id: String,
    ordering: StudentOrdering,
    core: StoreCore<Student>,
}

impl<G: Gateway> StudentStore<G> {
    pub fn new(gateway: Arc<G>, class_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            gateway,
            class_id: class_id.into(),
            ordering: StudentOrdering::default(),
            core: StoreCore::new("students", timeout),
        }
    }

    pub fn with_ordering(mut self, ordering: StudentOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn ordering(&self) -> StudentOrdering {
        self.ordering
    }

    pub fn state(&self) -> RosterState<Student> {
        self.core.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterState<Student>> {
        self.core.subscribe()
    }

    pub fn cancel(&self) {
        self.core.cancel();
    }

    pub async fn fetch(&self) -> Result<Arc<Vec<Student>>> {
        let query = Query::new()
            .eq("class_id", &self.class_id)
            .order_by("name", true);

        self.core
            .run("fetch", async {
                self.core.dispatch(Action::FetchStarted);
                let rows: Vec<Student> = self.gateway.select(Table::Students, &query).await?;
                tracing::debug!("Fetched {} students for class {}", rows.len(), self.class_id);
                self.core.dispatch(Action::FetchSucceeded(rows));
                Ok(self.core.entities())
            })
            .await
    }

    /// Inserts one student. A duplicate email in this class comes back as
    /// [`RosterError::ConstraintViolation`] and leaves the list as it was.
    pub async fn add_student(&self, input: &NewStudent) -> Result<Student> {
        self.ensure_own_class(std::slice::from_ref(input))?;
        self.core
            .run("add", async {
                let created: Student = self.gateway.insert_one(Table::Students, input).await?;
                tracing::info!("✅ Added student '{}' to class {}", created.name, created.class_id);
                self.core
                    .dispatch(Action::Inserted(vec![created.clone()], self.ordering.placement()));
                Ok(created)
            })
            .await
    }

    /// Inserts all rows in one gateway call. Either every row is stored and
    /// added to the list, or none is.
    pub async fn add_students_bulk(&self, inputs: &[NewStudent]) -> Result<Vec<Student>> {
        if inputs.is_empty() {
            return Err(RosterError::NoValidRows);
        }
        self.ensure_own_class(inputs)?;

        self.core
            .run("bulk add", async {
                let created: Vec<Student> =
                    self.gateway.insert_many(Table::Students, inputs).await?;
                if created.len() != inputs.len() {
                    // the batch was committed; keep the list in step with what the gateway returned
                    tracing::warn!(
                        "Gateway returned {} rows for a batch of {}",
                        created.len(),
                        inputs.len()
                    );
                }
                tracing::info!("✅ Imported {} students into class {}", created.len(), self.class_id);
                self.core
                    .dispatch(Action::Inserted(created.clone(), self.ordering.placement()));
                Ok(created)
            })
            .await
    }

    /// Parses pasted CSV text and bulk-inserts the accepted rows.
    ///
    /// Returns `NoValidRows` without calling the gateway when nothing parses.
    pub async fn import_csv(&self, text: &str) -> Result<ImportSummary> {
        let CsvImport {
            candidates,
            skipped_lines,
        } = parse_roster_csv(&self.class_id, text);

        if candidates.is_empty() {
            tracing::warn!("CSV import for class {} had no valid rows", self.class_id);
            return Err(RosterError::NoValidRows);
        }

        let inserted = self.add_students_bulk(&candidates).await?;
        Ok(ImportSummary {
            inserted,
            skipped_lines,
        })
    }

    /// Rows bound to another class would land in this list until the next fetch.
    fn ensure_own_class(&self, inputs: &[NewStudent]) -> Result<()> {
        match inputs.iter().find(|input| input.class_id != self.class_id) {
            Some(stray) => Err(RosterError::ValidationError {
                field: "class_id".to_string(),
                message: format!(
                    "Student '{}' belongs to class {}, not {}",
                    stray.name, stray.class_id, self.class_id
                ),
            }),
            None => Ok(()),
        }
    }

    pub async fn delete_student(&self, id: &str) -> Result<()> {
        self.core
            .run("delete", async {
                self.gateway.delete_by_id(Table::Students, id).await?;
                tracing::info!("🗑️ Removed student {}", id);
                self.core.dispatch(Action::Removed(id.to_string()));
                Ok(())
            })
            .await
    }
}
