/// Data layer: core types, loading, classification, filtering and queries.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │  cache    │ ───▶ │  loader   │  parse file → StudentTable
///   └──────────┘      └──────────┘   (ordinal order, Student_ID)
///        │
///        ▼
///   ┌──────────────┐
///   │ StudentTable  │  columns + kinds, shared as Arc
///   └──────────────┘
///        │
///        ├──▶ classify   which columns suit scatter / correlation / grouping
///        ├──▶ filter     predicates → new table
///        └──▶ query      stats, group means, correlation, comparison
/// ```

pub mod cache;
pub mod classify;
pub mod filter;
pub mod loader;
pub mod model;
pub mod ordinal;
pub mod query;
pub mod stats;
