//! Deterministic fixed-point math kernel
//!
//! Everything probability-shaped in the engine goes through this module:
//! the signed 64.64 type, the wide-division helper and the precomputed
//! normal-distribution tables with their lookup layer.

pub mod fixed_point;
pub mod table_lookup;
pub mod tables;
pub mod u256;

pub use fixed_point::I64F64;
pub use tables::{normal_tables, NormalTables};
