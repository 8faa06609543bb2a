//! Statement context: the bound, immutable description of one statement.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use fnv::FnvHasher;
use tracing::trace;

use super::identifier::{ColumnBinding, Scope};
use super::insert::InsertContext;
use super::order_by::{bind_group_by, bind_order_by, same_items, GroupByContext, OrderByContext};
use super::projection::{Projection, ProjectionsContext};
use super::subquery;
use super::tables::{bind_simple, BoundTable, TableSource, TablesContext};
use super::where_clause::{is_inner, parameter_markers, WhereOrigin, WhereSegmentContext};
use super::{Bindings, Error};
use crate::metadata::MetadataProvider;
use crate::segment::{
    CommentSegment, Expr, Identifier, ParameterMarker, ParameterMarkerKind, ParsedStatement, Position,
    SelectStatement, Statement, SubqueryKind, SubquerySegment, TableSegment, Value,
};

/// Bound statement.
///
/// Built once by [`bind`] and never modified afterwards. Every subquery
/// gets its own nested context, reachable with [`StatementContext::subquery_context`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatementContext {
    sql: Arc<str>,
    comments: Arc<[CommentSegment]>,
    parameters: Arc<[Value]>,
    database: String,
    statement: Statement,
    tables: TablesContext,
    projections: ProjectionsContext,
    group_by: GroupByContext,
    order_by: OrderByContext,
    subqueries: Vec<SubquerySegment>,
    subquery_contexts: BTreeMap<usize, StatementContext>,
    where_segments: Vec<WhereSegmentContext>,
    bindings: Bindings,
    parameter_markers: Vec<ParameterMarker>,
    insert: Option<InsertContext>,
    contains_enhanced_table: bool,
    fingerprint: u64,
}

impl StatementContext {
    /// SQL text the statement was parsed from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn comments(&self) -> &[CommentSegment] {
        &self.comments
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn position(&self) -> Position {
        self.statement.position()
    }

    pub fn tables(&self) -> &TablesContext {
        &self.tables
    }

    pub fn projections(&self) -> &ProjectionsContext {
        &self.projections
    }

    pub fn group_by(&self) -> &GroupByContext {
        &self.group_by
    }

    pub fn order_by(&self) -> &OrderByContext {
        &self.order_by
    }

    /// Every subquery, at any depth, in first-occurrence order.
    pub fn subqueries(&self) -> &[SubquerySegment] {
        &self.subqueries
    }

    /// Context of the subquery starting at `start`, at any depth.
    pub fn subquery_context(&self, start: usize) -> Option<&StatementContext> {
        self.subquery_contexts.get(&start).or_else(|| {
            self.subquery_contexts
                .values()
                .find_map(|context| context.subquery_context(start))
        })
    }

    /// Contexts of subqueries directly inside this statement.
    pub fn subquery_contexts(&self) -> impl Iterator<Item = &StatementContext> {
        self.subquery_contexts.values()
    }

    /// Own WHERE, JOIN ON conditions and the WHERE of every subquery.
    pub fn where_segments(&self) -> &[WhereSegmentContext] {
        &self.where_segments
    }

    pub fn parameter_markers(&self) -> &[ParameterMarker] {
        &self.parameter_markers
    }

    pub fn insert(&self) -> Option<&InsertContext> {
        self.insert.as_ref()
    }

    /// What the column segment at `position` resolved to, searching subqueries too.
    pub fn column_binding(&self, position: &Position) -> Option<&ColumnBinding> {
        self.bindings.get(position).or_else(|| {
            self.subquery_contexts
                .values()
                .find_map(|context| context.column_binding(position))
        })
    }

    /// Physical tables of this statement and all its subqueries.
    pub fn all_tables(&self) -> Vec<&BoundTable> {
        let mut tables: Vec<&BoundTable> = self
            .tables
            .tables()
            .iter()
            .filter(|table| table.is_physical())
            .collect();
        for context in self.subquery_contexts.values() {
            tables.extend(context.all_tables());
        }
        tables
    }

    /// Column projection at the one-based `index`.
    pub fn find_column_projection(&self, index: usize) -> Option<&Projection> {
        self.projections
            .get(index)
            .filter(|projection| projection.column_binding().is_some())
    }

    pub fn contains_subquery(&self) -> bool {
        !self.subqueries.is_empty()
    }

    pub fn contains_dollar_parameter_marker(&self) -> bool {
        self.parameter_markers
            .iter()
            .any(|marker| marker.kind == ParameterMarkerKind::Dollar)
    }

    pub fn contains_partial_distinct_aggregation(&self) -> bool {
        self.projections.contains_partial_distinct_aggregation()
    }

    pub fn contains_enhanced_table(&self) -> bool {
        self.contains_enhanced_table
    }

    pub fn is_same_group_by_and_order_by_items(&self) -> bool {
        same_items(&self.group_by, &self.order_by)
    }

    /// Hash of everything the context was bound from.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Bind a parsed statement against a metadata snapshot.
///
/// Pure: the same statement, metadata and parameters always
/// produce an equal context.
pub fn bind<M: MetadataProvider + ?Sized>(
    statement: &ParsedStatement,
    metadata: &M,
    parameters: &[Value],
    default_database: &str,
) -> Result<StatementContext, Error> {
    if metadata.default_schema(default_database).is_none() {
        return Err(Error::UnknownDatabase(default_database.into()));
    }

    let binder = Binder {
        metadata,
        database: default_database,
        sql: Arc::from(statement.sql.as_str()),
        comments: Arc::from(statement.comments.as_slice()),
        parameters: Arc::from(parameters),
    };

    let context = binder.statement(&statement.statement, None)?;
    trace!(
        "bound {} tables, {} projections, {} subqueries",
        context.tables.len(),
        context.projections.len(),
        context.subqueries.len()
    );
    Ok(context)
}

struct Binder<'a, M: ?Sized> {
    metadata: &'a M,
    database: &'a str,
    sql: Arc<str>,
    comments: Arc<[CommentSegment]>,
    parameters: Arc<[Value]>,
}

/// Parts of a context shared by every statement kind.
#[derive(Default)]
struct Parts {
    tables: TablesContext,
    projections: ProjectionsContext,
    group_by: GroupByContext,
    order_by: OrderByContext,
    subquery_contexts: BTreeMap<usize, StatementContext>,
    where_segments: Vec<WhereSegmentContext>,
    bindings: Bindings,
    insert: Option<InsertContext>,
}

impl<M: MetadataProvider + ?Sized> Binder<'_, M> {
    fn statement(
        &self,
        statement: &Statement,
        outer: Option<&Scope<'_>>,
    ) -> Result<StatementContext, Error> {
        let mut parts = Parts::default();

        match statement {
            Statement::Select(select) => self.select(select, outer, &mut parts)?,

            Statement::Insert(insert) => {
                let table = bind_simple(&insert.table, self.database, self.metadata)?;
                parts.insert = Some(InsertContext::bind(insert, &table, &self.parameters)?);
                parts.tables.push(table);

                let scope = Scope::new(&parts.tables, outer);
                for row in &insert.values {
                    for value in &row.values {
                        parts.bindings.resolve(value, &scope)?;
                    }
                }
                if let Some(select) = &insert.select {
                    let context = self.subquery(select, None)?;
                    parts.subquery_contexts.insert(select.position.start, context);
                }
            }

            Statement::Update(update) => {
                let joins = self.tables(&update.table, &mut parts)?;
                let scope = Scope::new(&parts.tables, outer);
                let mut bindings = std::mem::take(&mut parts.bindings);
                for assignment in &update.assignments {
                    for column in &assignment.columns {
                        let binding = scope.resolve(column)?;
                        bindings.insert(column.position, binding);
                    }
                    bindings.resolve(&assignment.value, &scope)?;
                }
                self.predicates(
                    update.where_clause.as_ref().map(|w| &w.expr),
                    joins,
                    &scope,
                    &mut bindings,
                    &mut parts.where_segments,
                )?;
                self.nested(
                    subquery::extract_direct(statement),
                    &scope,
                    &mut parts.subquery_contexts,
                )?;
                parts.bindings = bindings;
            }

            Statement::Delete(delete) => {
                let joins = self.tables(&delete.table, &mut parts)?;
                let scope = Scope::new(&parts.tables, outer);
                let mut bindings = std::mem::take(&mut parts.bindings);
                self.predicates(
                    delete.where_clause.as_ref().map(|w| &w.expr),
                    joins,
                    &scope,
                    &mut bindings,
                    &mut parts.where_segments,
                )?;
                self.nested(
                    subquery::extract_direct(statement),
                    &scope,
                    &mut parts.subquery_contexts,
                )?;
                parts.bindings = bindings;
            }
        }

        Ok(self.finish(statement, parts))
    }

    fn select(
        &self,
        select: &SelectStatement,
        outer: Option<&Scope<'_>>,
        parts: &mut Parts,
    ) -> Result<(), Error> {
        let joins = match &select.from {
            Some(from) => self.tables(from, parts)?,
            None => vec![],
        };

        let scope = Scope::new(&parts.tables, outer);
        let mut bindings = std::mem::take(&mut parts.bindings);

        let mut projections = ProjectionsContext::bind(&select.projections, &scope, &mut bindings)?;

        self.predicates(
            select.where_clause.as_ref().map(|w| &w.expr),
            joins,
            &scope,
            &mut bindings,
            &mut parts.where_segments,
        )?;

        if let Some(having) = &select.having {
            for column in having.columns() {
                match scope.resolve(column) {
                    Ok(binding) => bindings.insert(column.position, binding),
                    Err(err) => {
                        if column.owner.is_some()
                            || projections.find_alias(&column.name).is_none()
                        {
                            return Err(err);
                        }
                    }
                }
            }
        }

        let group_by =
            bind_group_by(select.group_by.as_ref(), &mut projections, &scope, &mut bindings)?;
        let order_by = bind_order_by(
            select.order_by.as_ref(),
            &group_by,
            &mut projections,
            &scope,
            &mut bindings,
        )?;

        let mut subquery_contexts = std::mem::take(&mut parts.subquery_contexts);
        self.nested(
            subquery::extract_select(select, false),
            &scope,
            &mut subquery_contexts,
        )?;

        parts.subquery_contexts = subquery_contexts;
        parts.projections = projections;
        parts.group_by = group_by;
        parts.order_by = order_by;
        parts.bindings = bindings;

        Ok(())
    }

    /// Bind FROM (or the DML target). Derived tables are bound first so
    /// their select lists become the table's columns. Returns join ON
    /// conditions with the tables each one covers.
    fn tables<'s>(
        &self,
        table: &'s TableSegment,
        parts: &mut Parts,
    ) -> Result<Vec<JoinCondition<'s>>, Error> {
        let mut joins = vec![];
        self.table(table, parts, &mut joins)?;
        Ok(joins)
    }

    fn table<'s>(
        &self,
        table: &'s TableSegment,
        parts: &mut Parts,
        joins: &mut Vec<JoinCondition<'s>>,
    ) -> Result<(), Error> {
        match table {
            TableSegment::Simple(simple) => {
                parts
                    .tables
                    .push(bind_simple(simple, self.database, self.metadata)?);
            }

            TableSegment::Subquery(derived) => {
                let context = self.subquery(&derived.subquery, None)?;
                let position = derived.subquery.position;
                let name = derived
                    .alias
                    .as_ref()
                    .map(|alias| alias.value.clone())
                    .unwrap_or_else(|| format!("subquery@{}", position.start));
                parts.tables.push(BoundTable {
                    position,
                    database: self.database.into(),
                    schema: String::new(),
                    name,
                    alias: derived.alias.clone(),
                    columns: context.projections.column_labels(),
                    hidden: vec![],
                    source: TableSource::Derived {
                        start: position.start,
                    },
                });
                parts.subquery_contexts.insert(position.start, context);
            }

            TableSegment::Function(function) => {
                let name = function
                    .alias
                    .as_ref()
                    .map(|alias| alias.value.clone())
                    .unwrap_or_else(|| function.function.name.clone());
                parts.tables.push(BoundTable {
                    position: function.function.position,
                    database: self.database.into(),
                    schema: String::new(),
                    name,
                    alias: function.alias.clone(),
                    columns: vec![],
                    hidden: vec![],
                    source: TableSource::Function,
                });
            }

            TableSegment::Join(join) => {
                let first = parts.tables.len();
                self.table(&join.left, parts, joins)?;
                let middle = parts.tables.len();
                self.table(&join.right, parts, joins)?;
                let last = parts.tables.len();

                for column in &join.using {
                    parts.tables.merge_column(column);
                }
                if join.natural {
                    let left = &parts.tables.tables()[first..middle];
                    let right = &parts.tables.tables()[middle..last];
                    let common: Vec<String> = left
                        .iter()
                        .flat_map(|table| table.columns.iter())
                        .filter(|column| {
                            right.iter().any(|table| {
                                table.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
                            })
                        })
                        .cloned()
                        .collect();
                    for column in common {
                        parts.tables.merge_column(&Identifier::new(&column));
                    }
                }

                if let Some(on) = &join.on {
                    joins.push(JoinCondition {
                        position: join.position,
                        expr: on,
                        inner: is_inner(join.join_type),
                        tables: first..last,
                    });
                }
            }
        }

        Ok(())
    }

    /// Resolve WHERE and ON columns and record them as where segments.
    fn predicates(
        &self,
        where_clause: Option<&Expr>,
        joins: Vec<JoinCondition<'_>>,
        scope: &Scope<'_>,
        bindings: &mut Bindings,
        where_segments: &mut Vec<WhereSegmentContext>,
    ) -> Result<(), Error> {
        for join in joins {
            bindings.resolve(join.expr, scope)?;
            where_segments.push(WhereSegmentContext {
                position: join.expr.position(),
                expr: join.expr.clone(),
                origin: WhereOrigin::Join {
                    position: join.position,
                    inner: join.inner,
                },
                tables: scope.tables.labels(join.tables),
                restricts: join.inner,
            });
        }

        if let Some(expr) = where_clause {
            bindings.resolve(expr, scope)?;
            where_segments.push(WhereSegmentContext {
                position: expr.position(),
                expr: expr.clone(),
                origin: WhereOrigin::Statement,
                tables: scope.tables.labels(0..scope.tables.len()),
                restricts: true,
            });
        }

        Ok(())
    }

    /// Bind direct child subqueries that aren't bound yet.
    fn nested(
        &self,
        subqueries: Vec<&SubquerySegment>,
        scope: &Scope<'_>,
        contexts: &mut BTreeMap<usize, StatementContext>,
    ) -> Result<(), Error> {
        for subquery in subqueries {
            if contexts.contains_key(&subquery.position.start) {
                continue;
            }
            let outer = match subquery.kind {
                SubqueryKind::Table | SubqueryKind::Combine | SubqueryKind::InsertSelect => None,
                _ => Some(scope),
            };
            let context = self.subquery(subquery, outer)?;
            contexts.insert(subquery.position.start, context);
        }
        Ok(())
    }

    fn subquery(
        &self,
        subquery: &SubquerySegment,
        outer: Option<&Scope<'_>>,
    ) -> Result<StatementContext, Error> {
        let statement = Statement::Select(subquery.select.as_ref().clone());
        self.statement(&statement, outer)
    }

    fn finish(&self, statement: &Statement, parts: Parts) -> StatementContext {
        let subqueries: Vec<SubquerySegment> =
            subquery::extract(statement).into_iter().cloned().collect();

        let filtering = subquery::filtering(statement);
        let mut where_segments = parts.where_segments;
        for (start, context) in &parts.subquery_contexts {
            let filters = filtering.contains(start);
            let position = subqueries
                .iter()
                .find(|subquery| subquery.position.start == *start)
                .map(|subquery| subquery.position)
                .unwrap_or_else(|| context.position());
            for segment in &context.where_segments {
                let mut segment = segment.clone();
                if segment.origin == WhereOrigin::Statement {
                    segment.origin = WhereOrigin::Subquery(position);
                }
                segment.restricts &= filters;
                where_segments.push(segment);
            }
        }

        let contains_enhanced_table = parts.tables.tables().iter().any(|table| {
            table.is_physical() && self.metadata.is_enhanced_table(&table.database, &table.name)
        }) || parts
            .subquery_contexts
            .values()
            .any(|context| context.contains_enhanced_table);

        let mut hasher = FnvHasher::default();
        self.sql.hash(&mut hasher);
        statement.hash(&mut hasher);
        self.parameters.hash(&mut hasher);
        self.database.hash(&mut hasher);
        self.metadata.version().hash(&mut hasher);

        StatementContext {
            sql: self.sql.clone(),
            comments: self.comments.clone(),
            parameters: self.parameters.clone(),
            database: self.database.to_string(),
            statement: statement.clone(),
            tables: parts.tables,
            projections: parts.projections,
            group_by: parts.group_by,
            order_by: parts.order_by,
            subqueries,
            subquery_contexts: parts.subquery_contexts,
            where_segments,
            bindings: parts.bindings,
            parameter_markers: parameter_markers(statement),
            insert: parts.insert,
            contains_enhanced_table,
            fingerprint: hasher.finish(),
        }
    }
}

struct JoinCondition<'a> {
    position: Position,
    expr: &'a Expr,
    inner: bool,
    tables: std::ops::Range<usize>,
}
