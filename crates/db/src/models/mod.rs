//! Row structs for persisted tables.
//!
//! Each submodule pairs a `FromRow` row struct with its conversion into the
//! matching core domain type.

pub mod assignment;
