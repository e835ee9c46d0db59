//! Domain model shared by the store, the query engine and the UI.

pub mod types;
