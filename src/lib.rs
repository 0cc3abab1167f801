//! Loads time series referenced by file name from an annotated table and
//! reshapes them into either a wide table (one row per series, one column per
//! timestamp) or a long table (one row per series sample, carrying the
//! source row's fields).

pub mod config;
pub mod data;
pub mod error;

pub use config::{AxisCheck, LongConfig, WideConfig};
pub use data::long::reshape_long;
pub use data::model::{Annotation, Column, Dataset, SemanticTag, StructuralType, Table, Value};
pub use data::resolve::{can_accept_long, can_accept_wide};
pub use data::wide::reshape_wide;
pub use error::{Error, Result};
