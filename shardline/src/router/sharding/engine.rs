//! Sharding route engine.

use indexmap::IndexMap;
use tracing::debug;

use super::condition::{Conjunction, ShardingConditions, ShardingKey};
use crate::binder::{InsertContext, StatementContext};
use crate::router::{Error, RouteMapper, RouteUnit};
use crate::rules::{DataNode, RuleSet, ShardingStrategy, TableRule};
use crate::segment::{Statement, UpdateStatement, Value};

/// Units picked by the sharding rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingRoute {
    pub units: Vec<RouteUnit>,
    /// Data node of every INSERT row.
    pub insert_data_nodes: Vec<DataNode>,
}

/// Routes one statement with the sharding rule.
#[derive(Debug)]
pub struct ShardingRouteEngine<'a> {
    context: &'a StatementContext,
    rules: &'a RuleSet,
}

impl<'a> ShardingRouteEngine<'a> {
    pub fn new(context: &'a StatementContext, rules: &'a RuleSet) -> Self {
        Self { context, rules }
    }

    /// Logic tables of the statement and its subqueries, without duplicates.
    pub fn logic_tables(&self) -> Vec<&'a str> {
        let mut tables: Vec<&str> = vec![];
        for table in self.context.all_tables() {
            if !tables
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&table.name))
            {
                tables.push(&table.name);
            }
        }
        tables
    }

    pub fn route(&self) -> Result<ShardingRoute, Error> {
        let tables = self.logic_tables();

        match self.context.statement() {
            Statement::Insert(_) => match self.context.insert() {
                Some(insert) => self.route_insert(insert, &tables),
                None => self.route_query(&tables),
            },
            Statement::Update(update) => {
                self.check_assignments(update)?;
                self.route_query(&tables)
            }
            Statement::Select(_) | Statement::Delete(_) => self.route_query(&tables),
        }
    }

    fn check_assignments(&self, update: &UpdateStatement) -> Result<(), Error> {
        let sharding = self.rules.sharding();
        for table in self.context.tables().tables() {
            for column in update.assignments.iter().flat_map(|a| a.columns.iter()) {
                let owned = column
                    .owner
                    .as_ref()
                    .map(|owner| table.owner_matches(owner))
                    .unwrap_or(true);
                if owned && sharding.is_sharding_column(&table.name, &column.name.value) {
                    return Err(Error::ShardingColumnUpdate {
                        table: table.name.clone(),
                        column: column.name.value.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn route_insert(
        &self,
        insert: &InsertContext,
        tables: &[&'a str],
    ) -> Result<ShardingRoute, Error> {
        let Some(rule) = self.rules.sharding().table_rule(&insert.table) else {
            return self.route_query(tables);
        };

        if insert.select.is_some() {
            return Err(Error::InsertSelect(insert.table.clone()));
        }

        let columns = rule.sharding_columns();
        let cluster = [rule.logic_table.as_str()];
        let mut insert_data_nodes = vec![];

        for row in 0..insert.values.len() {
            let conditions = ShardingConditions::from_insert_row(insert, row, &columns)
                .map_err(|column| Error::MissingShardingValue {
                    table: insert.table.clone(),
                    column,
                })?;
            let mut nodes = data_nodes(rule, &cluster, &conditions)?;
            match nodes.pop() {
                Some(node) if nodes.is_empty() => insert_data_nodes.push(node),
                _ => {
                    return Err(Error::MultiNodeInsert {
                        table: insert.table.clone(),
                    })
                }
            }
        }

        let nodes = if insert.values.is_empty() {
            rule.data_nodes.clone()
        } else {
            let mut unique: Vec<DataNode> = vec![];
            for node in &insert_data_nodes {
                if !unique.contains(node) {
                    unique.push(node.clone());
                }
            }
            unique
        };

        let others = self.ride_along(tables, &cluster);
        let units = nodes
            .iter()
            .map(|node| {
                let mut mappers = vec![RouteMapper::new(&rule.logic_table, &node.table)];
                mappers.extend(others.iter().map(|table| RouteMapper::identity(table)));
                RouteUnit::new(RouteMapper::identity(&node.data_source), mappers)
            })
            .collect::<Vec<_>>();

        debug!(
            "INSERT into \"{}\" routed {} rows to {} units",
            insert.table,
            insert_data_nodes.len(),
            units.len()
        );

        Ok(ShardingRoute {
            units,
            insert_data_nodes,
        })
    }

    fn route_query(&self, tables: &[&'a str]) -> Result<ShardingRoute, Error> {
        let sharding = self.rules.sharding();
        let sharded: Vec<&TableRule> = tables
            .iter()
            .filter_map(|table| sharding.table_rule(table))
            .collect();

        if sharded.is_empty() {
            return self.route_unsharded(tables);
        }

        let mut clusters: Vec<Vec<&TableRule>> = vec![];
        for rule in sharded {
            match clusters
                .iter_mut()
                .find(|cluster| sharding.is_bound(&cluster[0].logic_table, &rule.logic_table))
            {
                Some(cluster) => cluster.push(rule),
                None => clusters.push(vec![rule]),
            }
        }

        let conditions = ShardingConditions::from_statement(self.context, sharding);
        let mut routed = vec![];
        for cluster in &clusters {
            routed.push(route_cluster(cluster, &conditions)?);
        }

        let sharded_names: Vec<&str> = clusters
            .iter()
            .flatten()
            .map(|rule| rule.logic_table.as_str())
            .collect();
        let others = self.ride_along(tables, &sharded_names);

        let mut units = vec![];
        let Some((first, rest)) = routed.split_first() else {
            return Ok(ShardingRoute::default());
        };

        for (data_source, mappers) in first {
            if !rest.iter().all(|cluster| cluster.contains_key(data_source)) {
                continue;
            }

            let mut combinations: Vec<Vec<RouteMapper>> = mappers.clone();
            for cluster in rest {
                let mut next = vec![];
                for combination in &combinations {
                    for mappers in &cluster[data_source] {
                        let mut joined = combination.clone();
                        joined.extend(mappers.iter().cloned());
                        next.push(joined);
                    }
                }
                combinations = next;
            }

            for mut combination in combinations {
                combination.extend(others.iter().map(|table| RouteMapper::identity(table)));
                units.push(RouteUnit::new(RouteMapper::identity(data_source), combination));
            }
        }

        if units.is_empty() {
            return Err(Error::NoCommonDataSource {
                tables: sharded_names.iter().map(|name| name.to_string()).collect(),
            });
        }

        debug!(
            "{} sharded tables in {} groups routed to {} units",
            sharded_names.len(),
            clusters.len(),
            units.len()
        );

        Ok(ShardingRoute {
            units,
            insert_data_nodes: vec![],
        })
    }

    /// No sharded tables: broadcast or default data source.
    fn route_unsharded(&self, tables: &[&'a str]) -> Result<ShardingRoute, Error> {
        let sharding = self.rules.sharding();
        let mappers: Vec<RouteMapper> = tables
            .iter()
            .map(|table| RouteMapper::identity(table))
            .collect();

        let broadcast = !tables.is_empty() && tables.iter().all(|table| sharding.is_broadcast(table));

        let data_sources: Vec<&str> = if broadcast {
            if self.context.statement().is_write() {
                self.rules.data_sources().iter().map(|ds| ds.as_str()).collect()
            } else {
                self.rules
                    .data_sources()
                    .first()
                    .map(|ds| ds.as_str())
                    .into_iter()
                    .collect()
            }
        } else {
            self.rules.default_data_source().into_iter().collect()
        };

        debug!(
            "unsharded tables {:?} routed to {:?}{}",
            tables,
            data_sources,
            if broadcast { " (broadcast)" } else { "" }
        );

        Ok(ShardingRoute {
            units: data_sources
                .into_iter()
                .map(|ds| RouteUnit::new(RouteMapper::identity(ds), mappers.clone()))
                .collect(),
            insert_data_nodes: vec![],
        })
    }

    /// Broadcast and unsharded tables, sent wherever the sharded ones go.
    fn ride_along(&self, tables: &[&'a str], sharded: &[&str]) -> Vec<&'a str> {
        tables
            .iter()
            .copied()
            .filter(|table| !sharded.iter().any(|name| name.eq_ignore_ascii_case(table)))
            .collect()
    }
}

/// Route tables of one binding group. Returns, per data source, the
/// table mappers of every unit in it.
fn route_cluster(
    cluster: &[&TableRule],
    conditions: &ShardingConditions,
) -> Result<IndexMap<String, Vec<Vec<RouteMapper>>>, Error> {
    let names: Vec<&str> = cluster.iter().map(|rule| rule.logic_table.as_str()).collect();
    let primary = cluster
        .iter()
        .find(|rule| conditions.restricts(&rule.logic_table))
        .or_else(|| cluster.first())
        .copied();
    let Some(primary) = primary else {
        return Ok(IndexMap::new());
    };

    let mut routed: IndexMap<String, Vec<Vec<RouteMapper>>> = IndexMap::new();
    for node in data_nodes(primary, &names, conditions)? {
        let position = primary.position(&node).unwrap_or_default();
        let mut mappers = vec![];
        for rule in cluster {
            if rule.logic_table == primary.logic_table {
                mappers.push(RouteMapper::new(&rule.logic_table, &node.table));
                continue;
            }
            let actual = rule
                .actual_tables(&node.data_source)
                .get(position)
                .copied()
                .ok_or_else(|| Error::UnalignedBindingTable {
                    table: rule.logic_table.clone(),
                    data_source: node.data_source.clone(),
                    position,
                })?;
            mappers.push(RouteMapper::new(&rule.logic_table, actual));
        }
        routed.entry(node.data_source.clone()).or_default().push(mappers);
    }

    Ok(routed)
}

/// Data nodes of `rule` matching the conditions. Values given for
/// any table of `cluster` apply, since bound tables shard alike.
fn data_nodes(
    rule: &TableRule,
    cluster: &[&str],
    conditions: &ShardingConditions,
) -> Result<Vec<DataNode>, Error> {
    let Some(alternatives) = conditions.alternatives() else {
        return Ok(rule.data_nodes.clone());
    };

    let mut nodes: Vec<DataNode> = vec![];
    for conjunction in alternatives {
        for node in conjunction_nodes(rule, cluster, conjunction)? {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
    }
    Ok(nodes)
}

fn conjunction_nodes(
    rule: &TableRule,
    cluster: &[&str],
    conjunction: &Conjunction,
) -> Result<Vec<DataNode>, Error> {
    let all = rule.data_sources();
    let data_sources = match &rule.database_strategy {
        Some(strategy) => match values(conjunction, cluster, &strategy.column) {
            Some(values) => shard(rule, strategy, &all, &values)?,
            None => all,
        },
        None => all,
    };

    let mut nodes = vec![];
    for data_source in data_sources {
        let tables = rule.actual_tables(data_source);
        let tables = match &rule.table_strategy {
            Some(strategy) => match values(conjunction, cluster, &strategy.column) {
                Some(values) => {
                    let mut targets: Vec<&str> = vec![];
                    for value in &values {
                        if let Some(target) = strategy.algorithm.shard(&tables, value) {
                            if !targets.contains(&target) {
                                targets.push(target);
                            }
                        }
                    }
                    if targets.is_empty() {
                        return Err(no_data_node(rule, strategy, &values));
                    }
                    targets
                }
                None => tables,
            },
            None => tables,
        };
        nodes.extend(tables.into_iter().map(|table| DataNode::new(data_source, table)));
    }

    Ok(nodes)
}

fn shard<'t>(
    rule: &TableRule,
    strategy: &ShardingStrategy,
    targets: &[&'t str],
    values: &[Value],
) -> Result<Vec<&'t str>, Error> {
    let mut sharded: Vec<&str> = vec![];
    for value in values {
        let target = strategy
            .algorithm
            .shard(targets, value)
            .ok_or_else(|| no_data_node(rule, strategy, std::slice::from_ref(value)))?;
        if !sharded.contains(&target) {
            sharded.push(target);
        }
    }
    if sharded.is_empty() {
        return Err(no_data_node(rule, strategy, values));
    }
    Ok(sharded)
}

fn no_data_node(rule: &TableRule, strategy: &ShardingStrategy, values: &[Value]) -> Error {
    Error::NoDataNode {
        table: rule.logic_table.clone(),
        column: strategy.column.clone(),
        value: values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Values `column` is pinned to by any table of the cluster.
fn values(conjunction: &Conjunction, cluster: &[&str], column: &str) -> Option<Vec<Value>> {
    let mut values: Option<Vec<Value>> = None;
    for table in cluster {
        if let Some(pinned) = conjunction.get(&ShardingKey::new(table, column)) {
            values = Some(match values {
                None => pinned.clone(),
                Some(mut existing) => {
                    existing.retain(|value| pinned.contains(value));
                    existing
                }
            });
        }
    }
    values
}
