use crate::core::ops::StoreCore;
use crate::core::state::{Action, Placement, RosterState};
use crate::domain::model::{Class, ClassInsert, NewClass};
use crate::domain::ports::{Gateway, Query, Table};
use crate::utils::error::{Result, RosterError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// The signed-in owner's non-archived classes, newest first.
///
/// Operations on one store are applied one at a time in call order. The
/// store assumes a single editor per roster view; it does not reconcile
/// writes made by other clients until the next [`fetch`](ClassStore::fetch).
pub struct ClassStore<G: Gateway> {
    gateway: Arc<G>,
    owner_id: String,
    core: StoreCore<Class>,
}

impl<G: Gateway> ClassStore<G> {
    pub fn new(gateway: Arc<G>, owner_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            gateway,
            owner_id: owner_id.into(),
            core: StoreCore::new("classes", timeout),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner_id
    }

    pub fn state(&self) -> RosterState<Class> {
        self.core.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterState<Class>> {
        self.core.subscribe()
    }

    /// Aborts in-flight operations and rejects later ones. Call when the view goes away.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    pub async fn fetch(&self) -> Result<Arc<Vec<Class>>> {
        let query = Query::new()
            .eq("user_id", &self.owner_id)
            .is_null("archived_at")
            .order_by("created_at", false);

        self.core
            .run("fetch", async {
                self.core.dispatch(Action::FetchStarted);
                let rows: Vec<Class> = self.gateway.select(Table::Classes, &query).await?;
                // archived rows never enter the list, whatever the backend returned
                let rows: Vec<Class> = rows.into_iter().filter(|c| !c.is_archived()).collect();
                tracing::debug!("Fetched {} classes for {}", rows.len(), self.owner_id);
                self.core.dispatch(Action::FetchSucceeded(rows));
                Ok(self.core.entities())
            })
            .await
    }

    /// Inserts a class for the owner and puts it at the head of the list.
    ///
    /// Required fields are not checked here; see
    /// [`Validate`](crate::utils::validation::Validate) for the caller-side check.
    pub async fn create(&self, input: &NewClass) -> Result<Class> {
        let row = ClassInsert {
            user_id: &self.owner_id,
            class: input,
        };

        self.core
            .run("create", async {
                let created: Class = self.gateway.insert_one(Table::Classes, &row).await?;
                tracing::info!("✅ Created class '{}' ({})", created.name, created.id);
                self.core
                    .dispatch(Action::Inserted(vec![created.clone()], Placement::Front));
                Ok(created)
            })
            .await
    }

    /// Deletes by id. Succeeds even when no local class has that id, as long
    /// as the gateway accepts the request.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.core
            .run("delete", async {
                self.gateway.delete_by_id(Table::Classes, id).await?;
                tracing::info!("🗑️ Deleted class {}", id);
                self.core.dispatch(Action::Removed(id.to_string()));
                Ok(())
            })
            .await
    }

    /// Looks up a single class for the detail view. The list is not touched
    /// and a failed lookup is not recorded on the store state.
    pub async fn find(&self, id: &str) -> Result<Class> {
        if let Some(class) = self.core.entities().iter().find(|c| c.id == id) {
            return Ok(class.clone());
        }

        let query = Query::new().eq("id", id);
        let mut rows: Vec<Class> = tokio::time::timeout(
            self.core.timeout(),
            self.gateway.select(Table::Classes, &query),
        )
        .await
        .map_err(|_| RosterError::TimeoutError {
            timeout_ms: self.core.timeout().as_millis() as u64,
        })??;

        match rows.pop() {
            Some(class) if rows.is_empty() => Ok(class),
            Some(_) => Err(RosterError::GatewayError {
                message: format!("id {} matched more than one class", id),
                code: None,
            }),
            None => Err(RosterError::NotFoundError {
                message: format!("class {} does not exist", id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryGateway;
    use crate::core::state::Status;
    use crate::utils::error::ErrorKind;
    use serde_json::json;

    fn new_class(name: &str) -> NewClass {
        NewClass {
            name: name.to_string(),
            grade_level: "9".to_string(),
            subject: "Math".to_string(),
            academic_year: None,
        }
    }

    fn store(gateway: &Arc<MemoryGateway>) -> ClassStore<MemoryGateway> {
        ClassStore::new(Arc::clone(gateway), "teacher-1", Duration::from_secs(5))
    }

    async fn seed_class(gateway: &MemoryGateway, id: &str, owner: &str, created: &str, archived: bool) {
        let archived_at = if archived {
            json!("2024-06-30T00:00:00Z")
        } else {
            serde_json::Value::Null
        };
        gateway
            .seed(
                Table::Classes,
                json!({
                    "id": id,
                    "user_id": owner,
                    "name": format!("Class {}", id),
                    "grade_level": "10",
                    "subject": "History",
                    "created_at": created,
                    "updated_at": created,
                    "archived_at": archived_at,
                }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_returns_owned_active_classes_newest_first() {
        let gateway = Arc::new(MemoryGateway::new());
        seed_class(&gateway, "a", "teacher-1", "2024-01-01T00:00:00Z", false).await;
        seed_class(&gateway, "b", "teacher-2", "2024-01-02T00:00:00Z", false).await;
        seed_class(&gateway, "c", "teacher-1", "2024-01-03T00:00:00Z", true).await;
        seed_class(&gateway, "d", "teacher-1", "2024-01-04T00:00:00Z", false).await;

        let store = store(&gateway);
        assert_eq!(store.state().status, Status::Idle);

        let classes = store.fetch().await.unwrap();
        let ids: Vec<&str> = classes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a"]);
        assert_eq!(store.state().status, Status::Ready);
    }

    #[tokio::test]
    async fn test_create_prepends_and_tags_owner() {
        let gateway = Arc::new(MemoryGateway::new());
        seed_class(&gateway, "old", "teacher-1", "2024-01-01T00:00:00Z", false).await;
        let store = store(&gateway);
        store.fetch().await.unwrap();

        let created = store.create(&new_class("Algebra I")).await.unwrap();

        assert_eq!(created.user_id, "teacher-1");
        let state = store.state();
        assert_eq!(state.len(), 2);
        assert_eq!(state.entities[0].id, created.id);
        assert_eq!(state.entities[1].id, "old");
    }

    #[tokio::test]
    async fn test_failed_create_leaves_list_untouched() {
        let gateway = Arc::new(MemoryGateway::new());
        seed_class(&gateway, "a", "teacher-1", "2024-01-01T00:00:00Z", false).await;
        let store = store(&gateway);
        store.fetch().await.unwrap();
        let before = store.state().entities;

        gateway
            .fail_next(RosterError::NetworkError {
                message: "connection reset".to_string(),
            })
            .await;
        let err = store.create(&new_class("Chemistry")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        let state = store.state();
        assert!(Arc::ptr_eq(&before, &state.entities));
        assert_eq!(state.status, Status::Error);
        assert_eq!(state.error, Some(err));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stale_classes() {
        let gateway = Arc::new(MemoryGateway::new());
        seed_class(&gateway, "a", "teacher-1", "2024-01-01T00:00:00Z", false).await;
        let store = store(&gateway);
        store.fetch().await.unwrap();

        gateway
            .fail_next(RosterError::from_gateway(None, "JWT expired"))
            .await;
        assert!(store.fetch().await.is_err());

        let state = store.state();
        assert_eq!(state.status, Status::Error);
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_by_id() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = store(&gateway);
        let first = store.create(&new_class("A")).await.unwrap();
        let second = store.create(&new_class("B")).await.unwrap();

        store.delete(&first.id).await.unwrap();

        let state = store.state();
        assert_eq!(state.len(), 1);
        assert_eq!(state.entities[0].id, second.id);
        assert_eq!(gateway.row_count(Table::Classes).await, 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_succeeds_without_touching_others() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = store(&gateway);
        let kept = store.create(&new_class("Kept")).await.unwrap();

        assert!(store.delete("not-a-real-id").await.is_ok());

        let state = store.state();
        assert_eq!(state.len(), 1);
        assert_eq!(state.entities[0].id, kept.id);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_entity() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = store(&gateway);
        let kept = store.create(&new_class("Kept")).await.unwrap();
        let before = store.state().entities;

        gateway
            .fail_next(RosterError::from_gateway(Some("42501".to_string()), "permission denied"))
            .await;
        assert!(store.delete(&kept.id).await.is_err());
        assert!(Arc::ptr_eq(&before, &store.state().entities));
    }

    #[tokio::test]
    async fn test_find_reads_through_to_gateway() {
        let gateway = Arc::new(MemoryGateway::new());
        seed_class(&gateway, "archived", "teacher-1", "2024-01-01T00:00:00Z", true).await;
        let store = store(&gateway);

        let class = store.find("archived").await.unwrap();
        assert!(class.is_archived());
        assert!(store.state().is_empty());

        let err = store.find("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.state().status, Status::Idle);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = store(&gateway);
        let mut rx = store.subscribe();

        store.create(&new_class("Physics")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen.status, Status::Ready);
    }
}
