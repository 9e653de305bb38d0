//! Filter resolution and aggregation over dealer lead records.
//!
//! Records are loaded once into a [`store::RecordStore`]; each filter change
//! resolves a caller-owned [`filters::FilterState`] through the
//! [`compose::ViewComposer`], which produces one aggregation per configured
//! view.

pub mod aggregate;
pub mod canonical;
pub mod compose;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod filters;
pub mod loader;
pub mod models;
pub mod report;
pub mod store;
