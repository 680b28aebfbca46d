pub mod class_store;
pub mod csv_import;
pub(crate) mod ops;
pub mod state;
pub mod student_store;

pub use crate::domain::model::{Class, Entity, NewClass, NewStudent, Student};
pub use crate::domain::ports::{Gateway, Query, Table};
pub use crate::utils::error::Result;
