//! Statement routing.
//!
//! Sharding picks data nodes for every table the statement touches,
//! then shadow routing relabels data sources for shadow traffic.

pub mod error;
pub mod route;
pub mod shadow;
pub mod sharding;

use std::sync::Arc;

use tracing::debug;

pub use error::{Error, ErrorKind};
pub use route::{RouteContext, RouteFingerprint, RouteMapper, RouteState, RouteUnit};
pub use shadow::{ShadowColumnCondition, ShadowDecision};
pub use sharding::{ShardingConditions, ShardingRouteEngine};

use crate::binder::StatementContext;
use crate::rules::{RuleSet, RuleStore};
use crate::segment::{Expr, Value};

/// Routes statements with one rule set.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Arc<RuleSet>,
}

impl Router {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Router over the rules currently published in `store`.
    pub fn from_store(store: &RuleStore) -> Self {
        Self::new(store.load())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn route(&self, context: &StatementContext) -> Result<RouteContext, Error> {
        route(context, &self.rules)
    }

    pub fn route_into(
        &self,
        route: &mut RouteContext,
        context: &StatementContext,
    ) -> Result<(), Error> {
        route_into(route, context, &self.rules)
    }
}

/// Route a bound statement.
pub fn route(context: &StatementContext, rules: &RuleSet) -> Result<RouteContext, Error> {
    let mut route = RouteContext::new();
    route_into(&mut route, context, rules)?;
    Ok(route)
}

/// Route a bound statement into `route`, keeping units already in it.
///
/// Routing a routed context again is a no-op if the rules and the
/// statement are the same, and an error otherwise.
pub fn route_into(
    route: &mut RouteContext,
    context: &StatementContext,
    rules: &RuleSet,
) -> Result<(), Error> {
    let fingerprint = RouteFingerprint {
        rules: rules.version(),
        statement: context.fingerprint(),
    };

    if route.state() == RouteState::Routed {
        return if route.fingerprint() == Some(fingerprint) {
            debug!("statement already routed, skipping");
            Ok(())
        } else {
            Err(Error::AlreadyRouted)
        };
    }

    let engine = ShardingRouteEngine::new(context, rules);
    let tables = engine.logic_tables();
    route.advance(RouteState::TablesResolved);

    let sharding = engine.route()?;
    route.advance(RouteState::ConditionsExtracted);

    for unit in sharding.units {
        route.add_unit(unit);
    }
    if !sharding.insert_data_nodes.is_empty() {
        route.set_insert_data_nodes(sharding.insert_data_nodes);
    }

    shadow::engine(context.statement()).route(route, context, rules.shadow());

    if route.is_empty() {
        return Err(Error::NoDefaultDataSource);
    }

    route.finish(fingerprint);
    debug!(
        "tables {:?} routed to {} units{}",
        tables,
        route.len(),
        if route.shadow().is_shadow {
            " (shadow)"
        } else {
            ""
        }
    );

    Ok(())
}

/// Literal or bound parameter value.
pub(crate) fn value_of(expr: &Expr, parameters: &[Value]) -> Option<Value> {
    match expr {
        Expr::Literal(literal) => Some(literal.value.clone()),
        Expr::Parameter(parameter) => parameter.marker.value(parameters).cloned(),
        _ => None,
    }
}
