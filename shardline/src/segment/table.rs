use super::{Expr, FunctionSegment, Identifier, Position, SubquerySegment};

/// Plain table reference, e.g. `public.t_order AS o`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleTableSegment {
    pub position: Position,
    pub name: Identifier,
    /// Schema qualifier.
    pub owner: Option<Identifier>,
    pub alias: Option<Identifier>,
}

impl SimpleTableSegment {
    pub fn new(position: Position, name: &str) -> Self {
        Self {
            position,
            name: Identifier::new(name),
            owner: None,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(Identifier::new(alias));
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = Some(Identifier::new(owner));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinTableSegment {
    pub position: Position,
    pub left: Box<TableSegment>,
    pub right: Box<TableSegment>,
    pub join_type: JoinType,
    pub on: Option<Expr>,
    pub using: Vec<Identifier>,
    pub natural: bool,
}

/// Derived table, `(SELECT ...) AS alias`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubqueryTableSegment {
    pub subquery: SubquerySegment,
    pub alias: Option<Identifier>,
}

/// Table function, e.g. `generate_series(1, 10) AS g`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionTableSegment {
    pub function: FunctionSegment,
    pub alias: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableSegment {
    Simple(SimpleTableSegment),
    Join(JoinTableSegment),
    Subquery(SubqueryTableSegment),
    Function(FunctionTableSegment),
}

impl TableSegment {
    pub fn position(&self) -> Position {
        match self {
            Self::Simple(table) => table.position,
            Self::Join(join) => join.position,
            Self::Subquery(table) => table.subquery.position,
            Self::Function(table) => table.function.position,
        }
    }

    pub fn join(left: TableSegment, right: TableSegment, on: Option<Expr>) -> Self {
        let position = Position::new(left.position().start, right.position().stop);
        Self::Join(JoinTableSegment {
            position,
            left: Box::new(left),
            right: Box::new(right),
            join_type: JoinType::Inner,
            on,
            using: vec![],
            natural: false,
        })
    }

    /// Plain tables, left to right. Derived tables and
    /// functions are skipped.
    pub fn simple_tables(&self) -> Vec<&SimpleTableSegment> {
        match self {
            Self::Simple(table) => vec![table],
            Self::Join(join) => {
                let mut tables = join.left.simple_tables();
                tables.extend(join.right.simple_tables());
                tables
            }
            Self::Subquery(_) | Self::Function(_) => vec![],
        }
    }
}

impl From<SimpleTableSegment> for TableSegment {
    fn from(table: SimpleTableSegment) -> Self {
        Self::Simple(table)
    }
}
