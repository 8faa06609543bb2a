use serde::Serialize;

use super::{ColumnSegment, Expr, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderByKind {
    /// `ORDER BY 2`, one-based as written.
    Index(usize),
    Column(ColumnSegment),
    /// Any other expression. `expr` is absent when the parser
    /// only kept the text.
    Expression { text: String, expr: Option<Expr> },
}

/// One ORDER BY or GROUP BY item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderByItemSegment {
    pub position: Position,
    pub kind: OrderByKind,
    pub direction: OrderDirection,
    pub nulls_order: Option<NullsOrder>,
}

impl OrderByItemSegment {
    pub fn index(position: Position, index: usize) -> Self {
        Self {
            position,
            kind: OrderByKind::Index(index),
            direction: OrderDirection::Asc,
            nulls_order: None,
        }
    }

    pub fn column(column: ColumnSegment) -> Self {
        Self {
            position: column.position,
            kind: OrderByKind::Column(column),
            direction: OrderDirection::Asc,
            nulls_order: None,
        }
    }

    pub fn expression(position: Position, text: &str) -> Self {
        Self {
            position,
            kind: OrderByKind::Expression {
                text: text.into(),
                expr: None,
            },
            direction: OrderDirection::Asc,
            nulls_order: None,
        }
    }

    pub fn desc(mut self) -> Self {
        self.direction = OrderDirection::Desc;
        self
    }

    pub fn nulls(mut self, nulls_order: NullsOrder) -> Self {
        self.nulls_order = Some(nulls_order);
        self
    }

    /// Text used to match the item against projections.
    pub fn text(&self) -> String {
        match &self.kind {
            OrderByKind::Index(index) => index.to_string(),
            OrderByKind::Column(column) => column.qualified_name(),
            OrderByKind::Expression { text, .. } => text.clone(),
        }
    }
}

/// ORDER BY or GROUP BY clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct OrderBySegment {
    pub position: Position,
    pub items: Vec<OrderByItemSegment>,
}

impl OrderBySegment {
    pub fn new(position: Position, items: Vec<OrderByItemSegment>) -> Self {
        Self { position, items }
    }
}
