//! Shadow routing.
//!
//! Runs after sharding: it never picks tables, only swaps production
//! data sources for their shadows when the statement is shadow traffic.

pub mod condition;
pub mod determiner;
pub mod engine;
pub mod hint;

use serde::{Serialize, Serializer};

pub use condition::ShadowColumnCondition;
pub use engine::{
    engine, ShadowDeleteRouteEngine, ShadowInsertRouteEngine, ShadowRouteEngine,
    ShadowSelectRouteEngine, ShadowUpdateRouteEngine,
};

use super::{Error, RouteMapper};
use crate::rules::{ShadowDataSourceRule, ShadowHint};

/// Outcome of shadow determination for one statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ShadowDecision {
    pub is_shadow: bool,
    /// Mappings of the shadow tables involved.
    pub mappings: Vec<ShadowDataSourceRule>,
    pub hint: Option<ShadowHint>,
    /// Every comment of the statement, in source order.
    pub comments: Vec<String>,
    pub conditions: Vec<ShadowColumnCondition>,
    /// Column algorithms that couldn't be evaluated.
    #[serde(serialize_with = "messages")]
    pub unsupported: Vec<Error>,
}

impl ShadowDecision {
    /// First production to shadow mapping, if the statement is shadow traffic.
    pub fn data_source_mapper(&self) -> Option<RouteMapper> {
        if !self.is_shadow {
            return None;
        }
        self.mappings
            .first()
            .map(|mapping| RouteMapper::new(&mapping.production, &mapping.shadow))
    }

    /// Shadow of `production`, if the statement is shadow traffic.
    pub fn shadow_data_source(&self, production: &str) -> Option<&str> {
        if !self.is_shadow {
            return None;
        }
        self.mappings
            .iter()
            .find(|mapping| mapping.production == production)
            .map(|mapping| mapping.shadow.as_str())
    }
}

fn messages<S: Serializer>(errors: &[Error], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|error| error.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binder::bind;
    use crate::rules::ShadowRule;
    use crate::segment::Value;
    use crate::test::*;

    fn decide(statement: crate::segment::ParsedStatement, parameters: &[Value]) -> ShadowDecision {
        let context = bind(&statement, &metadata(), parameters, "logic_db").unwrap();
        let rules = rules();
        let rule: &ShadowRule = rules.shadow();
        engine(context.statement()).decide(&context, rule)
    }

    #[test]
    fn test_insert_with_hint() {
        let decision = decide(
            insert("t_user", &["user_id", "username"])
                .row(vec![lit(1), lit("jack")])
                .comment("/*shadow:true,foo:bar*/")
                .build(),
            &[],
        );

        assert!(decision.is_shadow);
        assert_eq!(decision.comments, vec!["/*shadow:true,foo:bar*/"]);
        assert_eq!(decision.conditions.len(), 1);
        assert_eq!(decision.conditions[0].column, "user_id");
        assert_eq!(decision.conditions[0].values[0].to_string(), "1");
        assert_eq!(
            decision.data_source_mapper(),
            Some(RouteMapper::new("ds_0", "ds_shadow_0"))
        );
    }

    #[test]
    fn test_any_algorithm_is_enough() {
        // Column value doesn't match, the hint does.
        let decision = decide(
            insert("t_user", &["user_id"])
                .row(vec![lit(2)])
                .comment("/*shadow:true,foo:bar*/")
                .build(),
            &[],
        );
        assert!(decision.is_shadow);

        // Column value matches, no hint.
        let decision = decide(
            select(vec![shorthand()], "t_user")
                .where_(eq(column("user_id"), param(0)))
                .build(),
            &[Value::Integer(1)],
        );
        assert!(decision.is_shadow);
        assert!(decision.hint.is_none());

        let decision = decide(
            select(vec![shorthand()], "t_user")
                .where_(eq(column("user_id"), lit(5)))
                .build(),
            &[],
        );
        assert!(!decision.is_shadow);
        assert_eq!(decision.data_source_mapper(), None);
    }

    #[test]
    fn test_missing_value_degrades() {
        let decision = decide(
            select(vec![shorthand()], "t_user")
                .where_(eq(column("username"), lit("jack")))
                .build(),
            &[],
        );
        assert!(!decision.is_shadow);
        assert_eq!(decision.unsupported.len(), 1);
        assert_eq!(
            decision.unsupported[0].kind(),
            crate::router::ErrorKind::UnsupportedShadowConfiguration
        );
    }

    #[test]
    fn test_default_algorithm() {
        let decision = decide(
            select(vec![shorthand()], "t_person")
                .comment("/*shadow:true,foo:bar*/")
                .build(),
            &[],
        );
        assert!(decision.is_shadow);
        assert_eq!(decision.mappings.len(), 2);

        let decision = decide(select(vec![shorthand()], "t_person").build(), &[]);
        assert!(!decision.is_shadow);
    }
}
