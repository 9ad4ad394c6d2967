//! API handlers module

pub mod assistant;
pub mod catalog;
pub mod health;
pub mod metrics;
