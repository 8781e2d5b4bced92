//! Data-preparation and query core of the student performance dashboard.
//!
//! Every page goes through the same path: the [`data::cache::TableCache`]
//! hands out one shared [`data::model::StudentTable`] per file version, the
//! classifier decides which columns each chart may use, and the query layer
//! derives new data without touching the table. [`views`] packages the result
//! per page for whatever renders it.

pub mod config;
pub mod data;
pub mod error;
pub mod state;
pub mod views;

pub use error::{DataError, DataResult};
