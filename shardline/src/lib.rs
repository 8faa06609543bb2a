//! Statement binding and shard/shadow routing.
//!
//! [`bind`] turns a parsed statement into a [`StatementContext`] against
//! a metadata snapshot; [`route`] maps it onto physical data sources and
//! tables with a [`RuleSet`].

// Submodules
pub mod binder;
pub mod error;
pub mod logger;
pub mod metadata;
pub mod router;
pub mod rules;
pub mod segment;


pub use binder::{bind, StatementContext};
pub use error::Error;
pub use metadata::{Metadata, MetadataProvider, MetadataStore};
pub use router::{route, RouteContext, RouteUnit, Router};
pub use rules::{AlgorithmRegistry, RuleSet, RuleStore};
pub use segment::{ParsedStatement, Value};

/// Bind and route in one go.
pub fn bind_and_route<M: MetadataProvider + ?Sized>(
    statement: &ParsedStatement,
    metadata: &M,
    parameters: &[Value],
    rules: &RuleSet,
) -> Result<(StatementContext, RouteContext), Error> {
    let database = rules.default_database();
    let context = bind(statement, metadata, parameters, database)?;
    let route = route(&context, rules)?;
    Ok((context, route))
}
