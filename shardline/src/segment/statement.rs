//! Statements and clauses.

use super::{
    ColumnSegment, Expr, OrderBySegment, ParameterMarker, Position, ProjectionsSegment,
    SimpleTableSegment, TableSegment,
};

/// Where the parser found a subquery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubqueryKind {
    #[default]
    Predicate,
    Projection,
    Table,
    In,
    Exists,
    /// Right arm of UNION/INTERSECT/EXCEPT.
    Combine,
    InsertSelect,
}

/// Nested SELECT. Identified by its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubquerySegment {
    pub position: Position,
    pub select: Box<SelectStatement>,
    pub kind: SubqueryKind,
}

impl SubquerySegment {
    pub fn new(position: Position, select: SelectStatement, kind: SubqueryKind) -> Self {
        Self {
            position,
            select: Box::new(select),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhereSegment {
    pub position: Position,
    pub expr: Expr,
}

impl WhereSegment {
    pub fn new(expr: Expr) -> Self {
        Self {
            position: expr.position(),
            expr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaginationValue {
    Literal(u64),
    Parameter(ParameterMarker),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimitSegment {
    pub position: Position,
    pub offset: Option<PaginationValue>,
    pub row_count: Option<PaginationValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineType {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// `<this select> UNION <right>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CombineSegment {
    pub position: Position,
    pub combine_type: CombineType,
    pub right: SubquerySegment,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SelectStatement {
    pub position: Position,
    pub projections: ProjectionsSegment,
    pub from: Option<TableSegment>,
    pub where_clause: Option<WhereSegment>,
    pub group_by: Option<OrderBySegment>,
    pub having: Option<Expr>,
    pub order_by: Option<OrderBySegment>,
    pub limit: Option<LimitSegment>,
    pub combine: Option<CombineSegment>,
}

/// One `( ... )` tuple of `VALUES`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsertValuesSegment {
    pub position: Position,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsertStatement {
    pub position: Position,
    pub table: SimpleTableSegment,
    /// `None` when the column list is omitted.
    pub columns: Option<Vec<ColumnSegment>>,
    pub values: Vec<InsertValuesSegment>,
    /// `INSERT ... SELECT`.
    pub select: Option<SubquerySegment>,
}

/// `SET a = 1` or `SET (a, b) = (1, 2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentSegment {
    pub position: Position,
    pub columns: Vec<ColumnSegment>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateStatement {
    pub position: Position,
    pub table: TableSegment,
    pub assignments: Vec<AssignmentSegment>,
    pub where_clause: Option<WhereSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteStatement {
    pub position: Position,
    pub table: TableSegment,
    pub where_clause: Option<WhereSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn position(&self) -> Position {
        match self {
            Self::Select(select) => select.position,
            Self::Insert(insert) => insert.position,
            Self::Update(update) => update.position,
            Self::Delete(delete) => delete.position,
        }
    }

    /// Statement modifies data.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Select(_))
    }

    pub fn where_clause(&self) -> Option<&WhereSegment> {
        match self {
            Self::Select(select) => select.where_clause.as_ref(),
            Self::Update(update) => update.where_clause.as_ref(),
            Self::Delete(delete) => delete.where_clause.as_ref(),
            Self::Insert(_) => None,
        }
    }
}

/// `/* ... */` comment, text included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommentSegment {
    pub position: Position,
    pub text: String,
}

impl CommentSegment {
    pub fn new(position: Position, text: &str) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }
}

/// Parser output: the statement, the SQL it came from and its comments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedStatement {
    pub sql: String,
    pub statement: Statement,
    pub comments: Vec<CommentSegment>,
}

impl ParsedStatement {
    pub fn new(sql: &str, statement: Statement) -> Self {
        Self {
            sql: sql.into(),
            statement,
            comments: vec![],
        }
    }

    pub fn with_comment(mut self, comment: CommentSegment) -> Self {
        self.comments.push(comment);
        self
    }
}
