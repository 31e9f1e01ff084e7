//! Ring domain types and the synthetic participant driver.

pub mod synthetic;
pub mod types;
