//! Route context: logic to actual data source and table names.

use std::fmt::Display;

use indexmap::IndexSet;
use serde::Serialize;

use super::shadow::ShadowDecision;
use crate::binder::StatementContext;
use crate::rules::DataNode;
use crate::segment::Statement;

/// Logic name and the physical name it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteMapper {
    pub logic_name: String,
    pub actual_name: String,
}

impl RouteMapper {
    pub fn new(logic_name: &str, actual_name: &str) -> Self {
        Self {
            logic_name: logic_name.into(),
            actual_name: actual_name.into(),
        }
    }

    /// Logic and actual names are the same.
    pub fn identity(name: &str) -> Self {
        Self::new(name, name)
    }
}

impl Display for RouteMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.logic_name, self.actual_name)
    }
}

/// One physical target: a data source and the tables used in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteUnit {
    pub data_source_mapper: RouteMapper,
    pub table_mappers: Vec<RouteMapper>,
}

impl RouteUnit {
    pub fn new(data_source_mapper: RouteMapper, table_mappers: Vec<RouteMapper>) -> Self {
        Self {
            data_source_mapper,
            table_mappers,
        }
    }

    /// Actual data source.
    pub fn data_source(&self) -> &str {
        &self.data_source_mapper.actual_name
    }

    pub fn logic_tables(&self) -> impl Iterator<Item = &str> {
        self.table_mappers
            .iter()
            .map(|mapper| mapper.logic_name.as_str())
    }

    /// Actual name of `logic_table` in this unit.
    pub fn actual_table(&self, logic_table: &str) -> Option<&str> {
        self.table_mappers
            .iter()
            .find(|mapper| mapper.logic_name.eq_ignore_ascii_case(logic_table))
            .map(|mapper| mapper.actual_name.as_str())
    }
}

impl Display for RouteUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self
            .table_mappers
            .iter()
            .map(|mapper| mapper.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}] {{{}}}", self.data_source_mapper, tables)
    }
}

/// Routing progress. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum RouteState {
    #[default]
    Unrouted,
    TablesResolved,
    ConditionsExtracted,
    Routed,
}

/// What a route context was routed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RouteFingerprint {
    /// Rule set version.
    pub rules: u64,
    /// [`StatementContext::fingerprint`].
    pub statement: u64,
}

/// Where a statement goes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RouteContext {
    units: IndexSet<RouteUnit>,
    state: RouteState,
    fingerprint: Option<RouteFingerprint>,
    shadow: ShadowDecision,
    insert_data_nodes: Vec<DataNode>,
}

impl RouteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route units, in the order they were added.
    pub fn units(&self) -> &IndexSet<RouteUnit> {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Add a unit. Returns false if an equal unit is already there.
    pub fn add_unit(&mut self, unit: RouteUnit) -> bool {
        self.units.insert(unit)
    }

    pub fn state(&self) -> RouteState {
        self.state
    }

    pub fn fingerprint(&self) -> Option<RouteFingerprint> {
        self.fingerprint
    }

    pub fn shadow(&self) -> &ShadowDecision {
        &self.shadow
    }

    /// Data node of every INSERT row, in row order.
    pub fn insert_data_nodes(&self) -> &[DataNode] {
        &self.insert_data_nodes
    }

    /// Actual data sources, without duplicates.
    pub fn actual_data_sources(&self) -> Vec<&str> {
        let mut data_sources: Vec<&str> = vec![];
        for unit in &self.units {
            if !data_sources.contains(&unit.data_source()) {
                data_sources.push(unit.data_source());
            }
        }
        data_sources
    }

    /// Actual tables `logic_table` maps to, without duplicates.
    pub fn actual_tables(&self, logic_table: &str) -> Vec<&str> {
        let mut tables: Vec<&str> = vec![];
        for table in self
            .units
            .iter()
            .filter_map(|unit| unit.actual_table(logic_table))
        {
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        tables
    }

    pub fn is_single_unit(&self) -> bool {
        self.units.len() == 1
    }

    /// The statement can't be pushed down as is: it goes to more than
    /// one target and its result needs merging across them.
    pub fn requires_federation(&self, statement: &StatementContext) -> bool {
        if self.units.len() < 2 {
            return false;
        }

        match statement.statement() {
            Statement::Select(select) => {
                statement.projections().aggregations().next().is_some()
                    || statement.projections().distinct_row
                    || !statement.group_by().items.is_empty()
                    || !statement.order_by().items.is_empty()
                    || select.combine.is_some()
                    || statement.contains_subquery()
            }
            _ => false,
        }
    }

    pub(crate) fn advance(&mut self, state: RouteState) {
        if state > self.state {
            self.state = state;
        }
    }

    pub(crate) fn finish(&mut self, fingerprint: RouteFingerprint) {
        self.fingerprint = Some(fingerprint);
        self.state = RouteState::Routed;
    }

    /// Replace every unit with what `f` returns for it, keeping order.
    pub(crate) fn map_units(&mut self, f: impl FnMut(RouteUnit) -> RouteUnit) {
        let units = std::mem::take(&mut self.units);
        self.units = units.into_iter().map(f).collect();
    }

    pub(crate) fn set_shadow(&mut self, shadow: ShadowDecision) {
        self.shadow = shadow;
    }

    pub(crate) fn set_insert_data_nodes(&mut self, nodes: Vec<DataNode>) {
        self.insert_data_nodes = nodes;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit(ds: &str, tables: &[(&str, &str)]) -> RouteUnit {
        RouteUnit::new(
            RouteMapper::identity(ds),
            tables
                .iter()
                .map(|(logic, actual)| RouteMapper::new(logic, actual))
                .collect(),
        )
    }

    #[test]
    fn test_units_are_unique_and_ordered() {
        let mut route = RouteContext::new();
        assert!(route.add_unit(unit("ds_1", &[("t_order", "t_order_1")])));
        assert!(route.add_unit(unit("ds_0", &[("t_order", "t_order_0")])));
        assert!(!route.add_unit(unit("ds_1", &[("t_order", "t_order_1")])));
        assert!(route.add_unit(unit("ds_1", &[("t_order", "t_order_0")])));

        assert_eq!(route.len(), 3);
        assert_eq!(route.actual_data_sources(), vec!["ds_1", "ds_0"]);
        assert_eq!(route.actual_tables("T_ORDER"), vec!["t_order_1", "t_order_0"]);
        assert_eq!(
            route.units()[0].to_string(),
            "[ds_1 -> ds_1] {t_order -> t_order_1}"
        );
    }

    #[test]
    fn test_state_only_moves_forward() {
        let mut route = RouteContext::new();
        route.advance(RouteState::ConditionsExtracted);
        route.advance(RouteState::TablesResolved);
        assert_eq!(route.state(), RouteState::ConditionsExtracted);

        route.finish(RouteFingerprint {
            rules: 1,
            statement: 2,
        });
        assert_eq!(route.state(), RouteState::Routed);
        assert_eq!(route.fingerprint().map(|f| f.statement), Some(2));
    }

    #[test]
    fn test_map_units_merges_duplicates() {
        let mut route = RouteContext::new();
        route.add_unit(unit("ds_0", &[("t_user", "t_user")]));
        route.add_unit(unit("ds_0", &[("t_user", "t_user_0")]));
        route.map_units(|mut unit| {
            unit.table_mappers = vec![RouteMapper::identity("t_user")];
            unit
        });
        assert_eq!(route.len(), 1);
    }
}
