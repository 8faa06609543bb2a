//! Sharding routing: conditions and the route engine.

pub mod condition;
pub mod engine;

pub use condition::{Conjunction, ShardingConditions, ShardingKey};
pub use engine::{ShardingRoute, ShardingRouteEngine};
