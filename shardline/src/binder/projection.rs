//! Select list analysis.

use serde::Serialize;
use tracing::trace;

use super::identifier::{ColumnBinding, Scope};
use super::tables::TableSource;
use super::{Bindings, Error};
use crate::segment::{
    AggregationType, Identifier, ParameterMarker, Position, ProjectionSegment, ProjectionsSegment,
};

/// Hidden projection the merger needs but the query didn't ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DerivedKind {
    AvgCount,
    AvgSum,
    OrderBy,
    GroupBy,
}

impl DerivedKind {
    fn alias(&self, n: usize) -> String {
        match self {
            Self::AvgCount => format!("AVG_DERIVED_COUNT_{}", n),
            Self::AvgSum => format!("AVG_DERIVED_SUM_{}", n),
            Self::OrderBy => format!("ORDER_BY_DERIVED_{}", n),
            Self::GroupBy => format!("GROUP_BY_DERIVED_{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ProjectionKind {
    Column {
        binding: ColumnBinding,
        name: Identifier,
        owner: Option<Identifier>,
    },
    Expression,
    Aggregation {
        aggregation: AggregationType,
        distinct: bool,
        inner_text: String,
    },
    /// Scalar subquery, identified by its start offset.
    Subquery {
        start: usize,
    },
    Parameter(ParameterMarker),
}

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Projection {
    /// One-based, as seen by `ORDER BY n`.
    pub index: usize,
    /// Expression text, e.g. `user_id` or `COUNT(DISTINCT user_id)`.
    pub expression: String,
    pub alias: Option<Identifier>,
    pub kind: ProjectionKind,
    pub derived: Option<DerivedKind>,
    /// Absent for derived projections.
    pub position: Option<Position>,
}

impl Projection {
    /// Column label in the result set.
    pub fn label(&self) -> &str {
        match (&self.alias, &self.kind) {
            (Some(alias), _) => &alias.value,
            (None, ProjectionKind::Column { binding, .. }) => &binding.column,
            (None, _) => &self.expression,
        }
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self.kind, ProjectionKind::Aggregation { .. })
    }

    pub fn is_distinct_aggregation(&self) -> bool {
        matches!(
            self.kind,
            ProjectionKind::Aggregation { distinct: true, .. }
        )
    }

    pub fn column_binding(&self) -> Option<&ColumnBinding> {
        match &self.kind {
            ProjectionKind::Column { binding, .. } => Some(binding),
            _ => None,
        }
    }
}

/// Compare expressions ignoring whitespace and the case of
/// everything outside string literals.
pub(crate) fn same_expression(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut in_literal = false;
    for c in text.chars() {
        if c == '\'' {
            in_literal = !in_literal;
            normalized.push(c);
        } else if in_literal {
            normalized.push(c);
        } else if !c.is_whitespace() {
            normalized.extend(c.to_lowercase());
        }
    }
    normalized
}

/// Bound select list. Derived projections always come after
/// the visible ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProjectionsContext {
    pub distinct_row: bool,
    items: Vec<Projection>,
    visible: usize,
}

impl ProjectionsContext {
    /// Projections the query asked for, `*` expanded.
    pub fn visible(&self) -> &[Projection] {
        &self.items[..self.visible]
    }

    pub fn derived(&self) -> &[Projection] {
        &self.items[self.visible..]
    }

    /// Visible and derived projections.
    pub fn all(&self) -> &[Projection] {
        &self.items
    }

    /// Get projection by one-based index.
    pub fn get(&self, index: usize) -> Option<&Projection> {
        index.checked_sub(1).and_then(|i| self.items.get(i))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn aggregations(&self) -> impl Iterator<Item = &Projection> {
        self.visible().iter().filter(|p| p.is_aggregation())
    }

    pub fn distinct_aggregations(&self) -> impl Iterator<Item = &Projection> {
        self.visible().iter().filter(|p| p.is_distinct_aggregation())
    }

    /// More than one aggregation, some but not all of them DISTINCT.
    pub fn contains_partial_distinct_aggregation(&self) -> bool {
        let aggregations = self.aggregations().count();
        let distinct = self.distinct_aggregations().count();
        aggregations > 1 && distinct > 0 && aggregations != distinct
    }

    /// Labels of visible projections, in order.
    pub fn column_labels(&self) -> Vec<String> {
        self.visible()
            .iter()
            .map(|p| p.label().to_string())
            .collect()
    }

    pub(crate) fn find_alias(&self, alias: &Identifier) -> Option<usize> {
        self.items
            .iter()
            .find(|p| p.alias.as_ref().is_some_and(|a| a.matches(alias)))
            .map(|p| p.index)
    }

    /// Unaliased column projections by column name.
    pub(crate) fn find_column_label(&self, name: &Identifier) -> Option<usize> {
        self.items
            .iter()
            .find(|p| {
                p.alias.is_none()
                    && matches!(&p.kind, ProjectionKind::Column { binding, .. } if name.matches_name(&binding.column))
            })
            .map(|p| p.index)
    }

    pub(crate) fn find_column(&self, binding: &ColumnBinding) -> Option<usize> {
        self.items
            .iter()
            .find(|p| p.column_binding().is_some_and(|b| b.same_column(binding)))
            .map(|p| p.index)
    }

    pub(crate) fn find_expression(&self, text: &str) -> Option<usize> {
        self.items
            .iter()
            .find(|p| {
                same_expression(&p.expression, text)
                    || p.alias.as_ref().is_some_and(|a| a.matches_name(text))
            })
            .map(|p| p.index)
    }

    fn push(&mut self, expression: String, alias: Option<Identifier>, kind: ProjectionKind, position: Option<Position>) {
        self.items.push(Projection {
            index: self.items.len() + 1,
            expression,
            alias,
            kind,
            derived: None,
            position,
        });
        self.visible = self.items.len();
    }

    /// Append a hidden projection. Returns its index.
    pub(crate) fn push_derived(
        &mut self,
        expression: String,
        kind: ProjectionKind,
        derived: DerivedKind,
    ) -> usize {
        let n = self
            .derived()
            .iter()
            .filter(|p| p.derived == Some(derived))
            .count();
        let index = self.items.len() + 1;
        trace!("derived projection {} for \"{}\"", derived.alias(n), expression);
        self.items.push(Projection {
            index,
            expression,
            alias: Some(Identifier::new(&derived.alias(n))),
            kind,
            derived: Some(derived),
            position: None,
        });
        index
    }

    /// Bind the select list against the tables in scope.
    pub(crate) fn bind(
        segment: &ProjectionsSegment,
        scope: &Scope<'_>,
        bindings: &mut Bindings,
    ) -> Result<Self, Error> {
        let mut context = Self {
            distinct_row: segment.distinct_row,
            ..Default::default()
        };

        for item in &segment.items {
            match item {
                ProjectionSegment::Column(column) => {
                    let binding = scope.resolve(&column.column)?;
                    bindings.insert(column.column.position, binding.clone());
                    context.push(
                        column.column.qualified_name(),
                        column.alias.clone(),
                        ProjectionKind::Column {
                            binding,
                            name: column.column.name.clone(),
                            owner: column.column.owner.clone(),
                        },
                        Some(column.column.position),
                    );
                }

                ProjectionSegment::Expression(expression) => {
                    bindings.resolve(&expression.expr, scope)?;
                    context.push(
                        expression.text.clone(),
                        expression.alias.clone(),
                        ProjectionKind::Expression,
                        Some(expression.position),
                    );
                }

                ProjectionSegment::Aggregation(aggregation) => {
                    for arg in &aggregation.args {
                        bindings.resolve(arg, scope)?;
                    }
                    context.push(
                        aggregation.text(),
                        aggregation.alias.clone(),
                        ProjectionKind::Aggregation {
                            aggregation: aggregation.aggregation,
                            distinct: aggregation.distinct,
                            inner_text: aggregation.inner_text.clone(),
                        },
                        Some(aggregation.position),
                    );
                }

                ProjectionSegment::Subquery(subquery) => {
                    let position = subquery.subquery.position;
                    context.push(
                        format!("subquery@{}", position.start),
                        subquery.alias.clone(),
                        ProjectionKind::Subquery {
                            start: position.start,
                        },
                        Some(position),
                    );
                }

                ProjectionSegment::Parameter(parameter) => {
                    context.push(
                        parameter.marker.to_string(),
                        parameter.alias.clone(),
                        ProjectionKind::Parameter(parameter.marker),
                        Some(parameter.position),
                    );
                }

                ProjectionSegment::Shorthand(shorthand) => {
                    let tables = scope.tables.tables().iter().filter(|table| {
                        shorthand
                            .owner
                            .as_ref()
                            .map_or(true, |owner| table.owner_matches(owner))
                    });

                    let mut expanded = false;
                    for table in tables {
                        expanded = true;
                        if table.source == TableSource::Function {
                            trace!("can't expand columns of table function \"{}\"", table.label());
                            continue;
                        }
                        for column in table.visible_columns() {
                            let name = Identifier::new(column);
                            let segment = crate::segment::ColumnSegment {
                                position: shorthand.position,
                                name: name.clone(),
                                owner: Some(Identifier::new(table.label())),
                            };
                            let binding = scope.resolve(&segment)?;
                            context.push(
                                column.clone(),
                                None,
                                ProjectionKind::Column {
                                    binding,
                                    name,
                                    owner: shorthand.owner.clone(),
                                },
                                Some(shorthand.position),
                            );
                        }
                    }

                    if let (false, Some(owner)) = (expanded, &shorthand.owner) {
                        return Err(Error::UnknownTable(owner.value.clone()));
                    }
                }
            }
        }

        context.derive_aggregations();

        Ok(context)
    }

    /// AVG needs COUNT and SUM to be merged across shards; unaliased
    /// DISTINCT aggregations get a stable alias.
    fn derive_aggregations(&mut self) {
        let mut distinct = 0;
        let mut averages = vec![];

        for projection in self.items.iter_mut() {
            if let ProjectionKind::Aggregation {
                aggregation,
                distinct: is_distinct,
                inner_text,
            } = &projection.kind
            {
                if *is_distinct && projection.alias.is_none() {
                    projection.alias = Some(Identifier::new(&format!(
                        "AGGREGATION_DISTINCT_DERIVED_{}",
                        distinct
                    )));
                    distinct += 1;
                }
                if *aggregation == AggregationType::Avg {
                    averages.push((*is_distinct, inner_text.clone()));
                }
            }
        }

        for (is_distinct, inner_text) in averages {
            let prefix = if is_distinct { "DISTINCT " } else { "" };
            for (aggregation, derived) in [
                (AggregationType::Count, DerivedKind::AvgCount),
                (AggregationType::Sum, DerivedKind::AvgSum),
            ] {
                self.push_derived(
                    format!("{}({}{})", aggregation, prefix, inner_text),
                    ProjectionKind::Aggregation {
                        aggregation,
                        distinct: is_distinct,
                        inner_text: inner_text.clone(),
                    },
                    derived,
                );
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binder::bind;
    use crate::segment::Statement;
    use crate::test::*;

    #[test]
    fn test_shorthand_expansion() {
        let statement = select(vec![shorthand()], "t_order").build();
        let context = bind(&statement, &metadata(), &[], "logic_db").unwrap();
        let labels = context.projections().column_labels();
        assert_eq!(labels, vec!["order_id", "user_id", "status", "amount"]);
        assert_eq!(context.projections().get(2).unwrap().index, 2);
    }

    #[test]
    fn test_shorthand_skips_hidden_columns() {
        use crate::metadata::{
            ColumnMetadata, DatabaseMetadata, Metadata, SchemaMetadata, TableMetadata,
        };
        use crate::segment::{Identifier, ShorthandProjectionSegment};

        let metadata = Metadata::new().with_database(
            DatabaseMetadata::new("logic_db", "public").with_schema(
                SchemaMetadata::new("public").with_table(TableMetadata::new(
                    "t_secret",
                    vec![
                        ColumnMetadata::new("id", "bigint").primary_key(),
                        ColumnMetadata::new("secret", "varchar").hidden(),
                    ],
                )),
            ),
        );

        let statement = select(vec![shorthand()], "t_secret").build();
        let context = bind(&statement, &metadata, &[], "logic_db").unwrap();
        assert_eq!(context.projections().column_labels(), vec!["id"]);

        let owned = ProjectionSegment::Shorthand(ShorthandProjectionSegment {
            position: pos(),
            owner: Some(Identifier::new("t_secret")),
        });
        let statement = select(vec![owned], "t_secret").build();
        let context = bind(&statement, &metadata, &[], "logic_db").unwrap();
        assert_eq!(context.projections().column_labels(), vec!["id"]);

        let statement = select(vec![column_projection(column("secret"))], "t_secret")
            .where_(eq(column("secret"), lit("x")))
            .build();
        let context = bind(&statement, &metadata, &[], "logic_db").unwrap();
        assert_eq!(context.projections().column_labels(), vec!["secret"]);
        assert_eq!(context.tables().tables()[0].columns, vec!["id", "secret"]);
    }

    #[test]
    fn test_avg_derivation() {
        let statement = select(
            vec![
                column_projection(column("user_id")),
                aggregation(AggregationType::Avg, false, "amount"),
            ],
            "t_order",
        )
        .build();
        let context = bind(&statement, &metadata(), &[], "logic_db").unwrap();
        let projections = context.projections();
        assert_eq!(projections.visible().len(), 2);

        let derived = projections.derived();
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].index, 3);
        assert_eq!(derived[0].expression, "COUNT(amount)");
        assert_eq!(derived[0].label(), "AVG_DERIVED_COUNT_0");
        assert_eq!(derived[1].expression, "SUM(amount)");
        assert_eq!(derived[1].label(), "AVG_DERIVED_SUM_0");
    }

    #[test]
    fn test_partial_distinct_aggregation() {
        let partial = select(
            vec![
                aggregation(AggregationType::Count, true, "user_id"),
                aggregation(AggregationType::Sum, false, "amount"),
            ],
            "t_order",
        )
        .build();
        let context = bind(&partial, &metadata(), &[], "logic_db").unwrap();
        assert!(context.contains_partial_distinct_aggregation());
        assert_eq!(
            context.projections().get(1).unwrap().label(),
            "AGGREGATION_DISTINCT_DERIVED_0"
        );

        let all_distinct = select(
            vec![
                aggregation(AggregationType::Count, true, "user_id"),
                aggregation(AggregationType::Sum, true, "amount"),
            ],
            "t_order",
        )
        .build();
        let context = bind(&all_distinct, &metadata(), &[], "logic_db").unwrap();
        assert!(!context.contains_partial_distinct_aggregation());

        let single = select(
            vec![aggregation(AggregationType::Count, true, "user_id")],
            "t_order",
        )
        .build();
        let context = bind(&single, &metadata(), &[], "logic_db").unwrap();
        assert!(!context.contains_partial_distinct_aggregation());
        assert!(matches!(context.statement(), Statement::Select(_)));
    }

    #[test]
    fn test_same_expression() {
        assert!(same_expression("COUNT(DISTINCT user_id)", "count( distinct  user_id )"));
        assert!(!same_expression("SUM(a)", "SUM(b)"));
        assert!(!same_expression("'A'", "'a'"));
        assert!(!same_expression("concat(name, 'x y')", "CONCAT(name,'xy')"));
        assert!(same_expression("CONCAT(Name, 'It''s')", "concat( name , 'It''s' )"));
    }
}
