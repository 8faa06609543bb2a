//! Expressions and predicates.

use super::{Identifier, ParameterMarker, Position, SubquerySegment, Value};

/// Column reference, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnSegment {
    pub position: Position,
    pub name: Identifier,
    pub owner: Option<Identifier>,
}

impl ColumnSegment {
    pub fn new(position: Position, name: &str) -> Self {
        Self {
            position,
            name: Identifier::new(name),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = Some(Identifier::new(owner));
        self
    }

    /// `owner.name` or `name`.
    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.name),
            None => self.name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiteralSegment {
    pub position: Position,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterMarkerSegment {
    pub position: Position,
    pub marker: ParameterMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq | Self::Like
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryExpr {
    pub position: Position,
    pub left: Box<Expr>,
    pub operator: BinaryOperator,
    pub right: Box<Expr>,
}

/// `left [NOT] IN (list)`. `IN (SELECT ...)` carries
/// a single [`Expr::Subquery`] in `list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InListExpr {
    pub position: Position,
    pub left: Box<Expr>,
    pub list: Vec<Expr>,
    pub not: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BetweenExpr {
    pub position: Position,
    pub left: Box<Expr>,
    pub low: Box<Expr>,
    pub high: Box<Expr>,
    pub not: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotExpr {
    pub position: Position,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExistsExpr {
    pub position: Position,
    pub subquery: SubquerySegment,
    pub not: bool,
}

/// Function call, e.g. `lower(name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSegment {
    pub position: Position,
    pub name: String,
    pub args: Vec<Expr>,
    /// Full text as written.
    pub text: String,
}

/// Anything the parser didn't break down further.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommonExpr {
    pub position: Position,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Column(ColumnSegment),
    Literal(LiteralSegment),
    Parameter(ParameterMarkerSegment),
    Binary(BinaryExpr),
    InList(InListExpr),
    Between(BetweenExpr),
    Not(NotExpr),
    Subquery(SubquerySegment),
    Exists(ExistsExpr),
    Function(FunctionSegment),
    Common(CommonExpr),
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Self::Column(column) => column.position,
            Self::Literal(literal) => literal.position,
            Self::Parameter(parameter) => parameter.position,
            Self::Binary(binary) => binary.position,
            Self::InList(in_list) => in_list.position,
            Self::Between(between) => between.position,
            Self::Not(not) => not.position,
            Self::Subquery(subquery) => subquery.position,
            Self::Exists(exists) => exists.position,
            Self::Function(function) => function.position,
            Self::Common(common) => common.position,
        }
    }

    pub fn column(position: Position, name: &str) -> Self {
        Self::Column(ColumnSegment::new(position, name))
    }

    pub fn literal(position: Position, value: impl Into<Value>) -> Self {
        Self::Literal(LiteralSegment {
            position,
            value: value.into(),
        })
    }

    pub fn parameter(position: Position, marker: ParameterMarker) -> Self {
        Self::Parameter(ParameterMarkerSegment { position, marker })
    }

    /// Binary expression spanning both operands.
    pub fn binary(left: Expr, operator: BinaryOperator, right: Expr) -> Self {
        let position = Position::new(left.position().start, right.position().stop);
        Self::Binary(BinaryExpr {
            position,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOperator::Eq, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOperator::And, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOperator::Or, right)
    }

    pub fn in_list(position: Position, left: Expr, list: Vec<Expr>) -> Self {
        Self::InList(InListExpr {
            position,
            left: Box::new(left),
            list,
            not: false,
        })
    }

    /// Direct children, in source order. Subqueries are leaves here;
    /// callers decide whether to descend into them.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Self::Binary(binary) => vec![&binary.left, &binary.right],
            Self::InList(in_list) => {
                let mut children = vec![in_list.left.as_ref()];
                children.extend(in_list.list.iter());
                children
            }
            Self::Between(between) => vec![&between.left, &between.low, &between.high],
            Self::Not(not) => vec![&not.expr],
            Self::Function(function) => function.args.iter().collect(),
            Self::Column(_)
            | Self::Literal(_)
            | Self::Parameter(_)
            | Self::Subquery(_)
            | Self::Exists(_)
            | Self::Common(_) => vec![],
        }
    }

    /// Walk the expression depth-first, calling `f` on every node,
    /// without entering subqueries.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Column references outside of subqueries.
    pub fn columns(&self) -> Vec<&ColumnSegment> {
        let mut columns = vec![];
        self.walk(&mut |expr| {
            if let Expr::Column(column) = expr {
                columns.push(column);
            }
        });
        columns
    }
}

impl From<ColumnSegment> for Expr {
    fn from(column: ColumnSegment) -> Self {
        Self::Column(column)
    }
}
