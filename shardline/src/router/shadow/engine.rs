//! Shadow route engines, one per statement shape.

use tracing::debug;

use super::condition::{insert_values, predicate_values, ShadowColumnCondition};
use super::determiner::{column_matches, hint_matches};
use super::{hint, ShadowDecision};
use crate::binder::StatementContext;
use crate::router::{Error, RouteContext, RouteMapper, RouteUnit};
use crate::rules::{ShadowOperation, ShadowRule};
use crate::segment::{Statement, Value};

/// Decides whether a statement is shadow traffic and relabels the
/// route units' data sources accordingly.
pub trait ShadowRouteEngine: Sync {
    fn operation(&self) -> ShadowOperation;

    /// Values the statement gives `table`.`column`.
    fn column_values(
        &self,
        context: &StatementContext,
        table: &str,
        column: &str,
    ) -> Option<Vec<Value>>;

    fn decide(&self, context: &StatementContext, rule: &ShadowRule) -> ShadowDecision {
        let hint = hint::parse(context.comments());
        let mut decision = ShadowDecision {
            comments: context
                .comments()
                .iter()
                .map(|comment| comment.text.clone())
                .collect(),
            hint: hint.clone(),
            ..Default::default()
        };

        if !rule.is_enabled() {
            return decision;
        }

        let mut tables: Vec<&str> = vec![];
        for table in context.all_tables() {
            if rule.is_shadow_table(&table.name)
                && !tables.iter().any(|name| name.eq_ignore_ascii_case(&table.name))
            {
                tables.push(&table.name);
            }
        }

        if tables.is_empty() {
            if let Some((name, algorithm)) = rule.default_algorithm() {
                decision.mappings = rule.data_sources().cloned().collect();
                decision.is_shadow = hint_matches(algorithm, hint.as_ref());
                debug!(
                    "default shadow algorithm \"{}\" matched: {}",
                    name, decision.is_shadow
                );
            }
            return decision;
        }

        for table in tables {
            let mut matched = false;

            for (name, algorithm) in rule.column_algorithms(table, self.operation()) {
                let column = algorithm.column();
                match self.column_values(context, table, column) {
                    Some(values) => {
                        if column_matches(algorithm, &values) {
                            debug!("shadow algorithm \"{}\" matched \"{}\"", name, table);
                            matched = true;
                        }
                        let condition = ShadowColumnCondition {
                            table: table.to_string(),
                            column: column.to_string(),
                            values,
                        };
                        if !decision.conditions.contains(&condition) {
                            decision.conditions.push(condition);
                        }
                    }
                    None => {
                        debug!(
                            "shadow algorithm \"{}\" has no value for \"{}\".\"{}\"",
                            name, table, column
                        );
                        decision.unsupported.push(Error::UnsupportedShadowColumn {
                            table: table.to_string(),
                            column: column.to_string(),
                            algorithm: name.to_string(),
                        });
                    }
                }
            }

            for (name, algorithm) in rule.hint_algorithms(table) {
                if hint_matches(algorithm, hint.as_ref()) {
                    debug!("shadow hint algorithm \"{}\" matched \"{}\"", name, table);
                    matched = true;
                }
            }

            decision.is_shadow |= matched;
            for mapping in rule.mappings(table) {
                if !decision.mappings.contains(mapping) {
                    decision.mappings.push(mapping.clone());
                }
            }
        }

        decision
    }

    /// Relabel units whose data source has a shadow, and record the decision.
    fn route(&self, route: &mut RouteContext, context: &StatementContext, rule: &ShadowRule) {
        let decision = self.decide(context, rule);

        if route.is_empty() {
            let tables: Vec<RouteMapper> = context
                .tables()
                .table_names()
                .into_iter()
                .map(RouteMapper::identity)
                .collect();
            for mapping in &decision.mappings {
                let actual = if decision.is_shadow {
                    &mapping.shadow
                } else {
                    &mapping.production
                };
                route.add_unit(RouteUnit::new(
                    RouteMapper::new(&mapping.production, actual),
                    tables.clone(),
                ));
            }
        } else if decision.is_shadow {
            route.map_units(|mut unit| {
                if let Some(shadow) = decision.shadow_data_source(unit.data_source()) {
                    unit.data_source_mapper.actual_name = shadow.to_string();
                }
                unit
            });
        }

        route.set_shadow(decision);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowInsertRouteEngine;

impl ShadowRouteEngine for ShadowInsertRouteEngine {
    fn operation(&self) -> ShadowOperation {
        ShadowOperation::Insert
    }

    fn column_values(
        &self,
        context: &StatementContext,
        table: &str,
        column: &str,
    ) -> Option<Vec<Value>> {
        insert_values(context, table, column)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowSelectRouteEngine;

impl ShadowRouteEngine for ShadowSelectRouteEngine {
    fn operation(&self) -> ShadowOperation {
        ShadowOperation::Select
    }

    fn column_values(
        &self,
        context: &StatementContext,
        table: &str,
        column: &str,
    ) -> Option<Vec<Value>> {
        predicate_values(context, table, column)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowUpdateRouteEngine;

impl ShadowRouteEngine for ShadowUpdateRouteEngine {
    fn operation(&self) -> ShadowOperation {
        ShadowOperation::Update
    }

    fn column_values(
        &self,
        context: &StatementContext,
        table: &str,
        column: &str,
    ) -> Option<Vec<Value>> {
        predicate_values(context, table, column)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowDeleteRouteEngine;

impl ShadowRouteEngine for ShadowDeleteRouteEngine {
    fn operation(&self) -> ShadowOperation {
        ShadowOperation::Delete
    }

    fn column_values(
        &self,
        context: &StatementContext,
        table: &str,
        column: &str,
    ) -> Option<Vec<Value>> {
        predicate_values(context, table, column)
    }
}

/// Engine for the statement's shape.
pub fn engine(statement: &Statement) -> &'static dyn ShadowRouteEngine {
    match statement {
        Statement::Select(_) => &ShadowSelectRouteEngine,
        Statement::Insert(_) => &ShadowInsertRouteEngine,
        Statement::Update(_) => &ShadowUpdateRouteEngine,
        Statement::Delete(_) => &ShadowDeleteRouteEngine,
    }
}
