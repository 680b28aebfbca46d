pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{MemoryGateway, RestGateway};
pub use crate::config::RosterConfig;
pub use crate::core::{
    class_store::ClassStore,
    csv_import::{parse_roster_csv, CsvImport},
    state::{RosterState, Status},
    student_store::{ImportSummary, StudentOrdering, StudentStore},
};
pub use crate::utils::error::{ErrorKind, Result, RosterError};
