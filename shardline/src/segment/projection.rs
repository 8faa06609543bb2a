use std::fmt::Display;

use serde::Serialize;

use super::{ColumnSegment, Expr, Identifier, ParameterMarker, Position, SubquerySegment};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnProjectionSegment {
    pub column: ColumnSegment,
    pub alias: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpressionProjectionSegment {
    pub position: Position,
    pub expr: Expr,
    /// Expression as written.
    pub text: String,
    pub alias: Option<Identifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AggregationType {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl Display for AggregationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Max => "MAX",
            Self::Min => "MIN",
        };
        write!(f, "{}", name)
    }
}

/// `COUNT(DISTINCT user_id)` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregationProjectionSegment {
    pub position: Position,
    pub aggregation: AggregationType,
    pub distinct: bool,
    pub args: Vec<Expr>,
    /// Argument list as written, without parentheses or DISTINCT, e.g. `user_id`.
    pub inner_text: String,
    pub alias: Option<Identifier>,
}

impl AggregationProjectionSegment {
    /// Normalized text, e.g. `COUNT(DISTINCT user_id)`.
    pub fn text(&self) -> String {
        if self.distinct {
            format!("{}(DISTINCT {})", self.aggregation, self.inner_text)
        } else {
            format!("{}({})", self.aggregation, self.inner_text)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubqueryProjectionSegment {
    pub subquery: SubquerySegment,
    pub alias: Option<Identifier>,
}

/// `*` or `owner.*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShorthandProjectionSegment {
    pub position: Position,
    pub owner: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterProjectionSegment {
    pub position: Position,
    pub marker: ParameterMarker,
    pub alias: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectionSegment {
    Column(ColumnProjectionSegment),
    Expression(ExpressionProjectionSegment),
    Aggregation(AggregationProjectionSegment),
    Subquery(SubqueryProjectionSegment),
    Shorthand(ShorthandProjectionSegment),
    Parameter(ParameterProjectionSegment),
}

impl ProjectionSegment {
    pub fn position(&self) -> Position {
        match self {
            Self::Column(column) => column.column.position,
            Self::Expression(expression) => expression.position,
            Self::Aggregation(aggregation) => aggregation.position,
            Self::Subquery(subquery) => subquery.subquery.position,
            Self::Shorthand(shorthand) => shorthand.position,
            Self::Parameter(parameter) => parameter.position,
        }
    }

    pub fn alias(&self) -> Option<&Identifier> {
        match self {
            Self::Column(column) => column.alias.as_ref(),
            Self::Expression(expression) => expression.alias.as_ref(),
            Self::Aggregation(aggregation) => aggregation.alias.as_ref(),
            Self::Subquery(subquery) => subquery.alias.as_ref(),
            Self::Parameter(parameter) => parameter.alias.as_ref(),
            Self::Shorthand(_) => None,
        }
    }

    pub fn column(column: ColumnSegment) -> Self {
        Self::Column(ColumnProjectionSegment {
            column,
            alias: None,
        })
    }

    pub fn aliased_column(column: ColumnSegment, alias: &str) -> Self {
        Self::Column(ColumnProjectionSegment {
            column,
            alias: Some(Identifier::new(alias)),
        })
    }

    pub fn shorthand(position: Position) -> Self {
        Self::Shorthand(ShorthandProjectionSegment {
            position,
            owner: None,
        })
    }
}

/// Select list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProjectionsSegment {
    pub position: Position,
    pub distinct_row: bool,
    pub items: Vec<ProjectionSegment>,
}

impl ProjectionsSegment {
    pub fn new(position: Position, items: Vec<ProjectionSegment>) -> Self {
        Self {
            position,
            distinct_row: false,
            items,
        }
    }
}
