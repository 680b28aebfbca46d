//! Store state and its transitions.
//!
//! Every change a roster store makes to its state goes through [`reduce`], a
//! pure function of the previous state and an [`Action`]. A failed action keeps
//! the previous `entities` allocation, so observers holding the old
//! `Arc` can see that nothing moved.

use crate::domain::model::Entity;
use crate::utils::error::RosterError;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone)]
pub struct RosterState<T> {
    pub status: Status,
    pub entities: Arc<Vec<T>>,
    pub error: Option<RosterError>,
}

impl<T> Default for RosterState<T> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            entities: Arc::new(Vec::new()),
            error: None,
        }
    }
}

impl<T> RosterState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Where freshly inserted records land in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Front,
    Back,
    /// Name-sorted position; ties go after existing equal names.
    ByName,
}

#[derive(Debug, Clone)]
pub enum Action<T> {
    FetchStarted,
    FetchSucceeded(Vec<T>),
    Inserted(Vec<T>, Placement),
    Removed(String),
    Failed(RosterError),
}

pub fn reduce<T: Entity>(state: &RosterState<T>, action: Action<T>) -> RosterState<T> {
    match action {
        Action::FetchStarted => RosterState {
            status: Status::Loading,
            entities: Arc::clone(&state.entities),
            error: None,
        },
        Action::FetchSucceeded(entities) => RosterState {
            status: Status::Ready,
            entities: Arc::new(entities),
            error: None,
        },
        Action::Inserted(records, placement) => {
            let mut entities = Vec::with_capacity(state.entities.len() + records.len());
            match placement {
                Placement::Front => {
                    entities.extend(records);
                    entities.extend(state.entities.iter().cloned());
                }
                Placement::Back => {
                    entities.extend(state.entities.iter().cloned());
                    entities.extend(records);
                }
                Placement::ByName => {
                    entities.extend(state.entities.iter().cloned());
                    for record in records {
                        let at = entities.partition_point(|e| e.name() <= record.name());
                        entities.insert(at, record);
                    }
                }
            }
            RosterState {
                status: Status::Ready,
                entities: Arc::new(entities),
                error: None,
            }
        }
        Action::Removed(id) => RosterState {
            status: Status::Ready,
            entities: Arc::new(
                state
                    .entities
                    .iter()
                    .filter(|e| e.id() != id)
                    .cloned()
                    .collect(),
            ),
            error: None,
        },
        Action::Failed(error) => RosterState {
            status: Status::Error,
            entities: Arc::clone(&state.entities),
            error: Some(error),
        },
    }
}
