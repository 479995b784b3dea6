//! Document definition helpers

pub mod macros;
