//! Rule configuration for shardline.
//!
//! Everything here is plain data: the router compiles it into
//! rule objects and never reads these structs mid-route.

// Submodules
pub mod algorithm;
pub mod core;
pub mod error;
pub mod general;
pub mod shadow;
pub mod sharding;

pub use algorithm::{AlgorithmConfig, PropValue, Props};
pub use core::Config;
pub use error::Error;
pub use general::{General, LogFormat};
pub use shadow::{Shadow, ShadowDataSource, ShadowTable};
pub use sharding::{ShardedTable, Sharding, StrategyConfig};
