use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use shardline::metadata::{ColumnMetadata, DatabaseMetadata, SchemaMetadata, TableMetadata};
use shardline::router::ErrorKind;
use shardline::segment::{
    ColumnSegment, CommentSegment, ExistsExpr, Expr, Identifier, InsertStatement,
    InsertValuesSegment, NotExpr, ParameterMarker, ParsedStatement, Position, ProjectionSegment,
    ProjectionsSegment, SelectStatement, SimpleTableSegment, Statement, SubqueryKind,
    SubqueryProjectionSegment, SubquerySegment, Value, WhereSegment,
};
use shardline::{
    bind, bind_and_route, AlgorithmRegistry, Error, Metadata, MetadataStore, Router, RuleSet,
    RuleStore,
};
use shardline_config::Config;

const CONFIG: &str = r#"
[general]
data_sources = ["ds_0", "ds_1"]
default_data_source = "ds_0"

[sharding]
broadcast_tables = ["t_config"]

[[sharding.tables]]
name = "t_order"
actual_data_nodes = "ds_${0..1}.t_order_${0..1}"
database_strategy = { column = "user_id", algorithm = "database_mod" }
table_strategy = { column = "order_id", algorithm = "table_mod" }

[[sharding.algorithms]]
name = "database_mod"
type = "mod"
props = { sharding_count = 2 }

[[sharding.algorithms]]
name = "table_mod"
type = "mod"
props = { sharding_count = 2 }

[shadow]
default_algorithm = "simple_hint"

[[shadow.data_sources]]
name = "shadow_0"
production = "ds_0"
shadow = "ds_shadow_0"

[[shadow.data_sources]]
name = "shadow_1"
production = "ds_1"
shadow = "ds_shadow_1"

[[shadow.tables]]
name = "t_user"
data_sources = ["shadow_0"]
algorithms = ["user_id_match", "simple_hint"]

[[shadow.algorithms]]
name = "user_id_match"
type = "column_value_match"
props = { column = "user_id", operation = "insert", value = 1 }

[[shadow.algorithms]]
name = "simple_hint"
type = "simple_hint"
props = { foo = "bar" }
"#;

static NEXT: AtomicUsize = AtomicUsize::new(1);

fn pos() -> Position {
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    Position::new(n * 10, n * 10 + 9)
}

fn column(name: &str) -> ColumnSegment {
    ColumnSegment::new(pos(), name)
}

fn eq(column: &str, value: Expr) -> Expr {
    Expr::eq(Expr::Column(self::column(column)), value)
}

fn literal(value: impl Into<Value>) -> Expr {
    Expr::literal(pos(), value)
}

fn select_items(
    items: Vec<ProjectionSegment>,
    table: &str,
    where_clause: Option<Expr>,
) -> SelectStatement {
    SelectStatement {
        position: pos(),
        projections: ProjectionsSegment::new(pos(), items),
        from: Some(SimpleTableSegment::new(pos(), table).into()),
        where_clause: where_clause.map(WhereSegment::new),
        ..Default::default()
    }
}

fn select_all(table: &str, where_clause: Option<Expr>) -> ParsedStatement {
    let select = select_items(vec![ProjectionSegment::shorthand(pos())], table, where_clause);
    ParsedStatement::new("SELECT", Statement::Select(select))
}

/// (SELECT status FROM t_order WHERE user_id = 1 AND order_id = 1)
fn single_order(kind: SubqueryKind) -> SubquerySegment {
    let select = select_items(
        vec![ProjectionSegment::column(column("status"))],
        "t_order",
        Some(Expr::and(eq("user_id", literal(1)), eq("order_id", literal(1)))),
    );
    SubquerySegment::new(pos(), select, kind)
}

fn insert(table: &str, columns: &[&str], rows: Vec<Vec<Expr>>) -> ParsedStatement {
    let insert = InsertStatement {
        position: pos(),
        table: SimpleTableSegment::new(pos(), table),
        columns: Some(columns.iter().map(|name| column(name)).collect()),
        values: rows
            .into_iter()
            .map(|values| InsertValuesSegment {
                position: pos(),
                values,
            })
            .collect(),
        select: None,
    };
    ParsedStatement::new("INSERT", Statement::Insert(insert))
}

fn metadata(rules: &RuleSet) -> Metadata {
    let schema = SchemaMetadata::new("public")
        .with_table(TableMetadata::new(
            "t_order",
            vec![
                ColumnMetadata::new("order_id", "bigint").primary_key(),
                ColumnMetadata::new("user_id", "bigint"),
                ColumnMetadata::new("status", "varchar"),
            ],
        ))
        .with_table(TableMetadata::new(
            "t_user",
            vec![
                ColumnMetadata::new("user_id", "bigint").primary_key(),
                ColumnMetadata::new("username", "varchar"),
            ],
        ))
        .with_table(TableMetadata::new(
            "t_config",
            vec![ColumnMetadata::new("id", "bigint").primary_key()],
        ));
    let enhanced = rules.enhanced_tables();

    Metadata::new()
        .with_database(DatabaseMetadata::new("logic_db", "public").with_schema(schema))
        .with_enhanced_tables(enhanced.iter().map(|table| table.as_str()))
}

fn load_rules() -> RuleSet {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let config = Config::load(file.path()).unwrap();
    shardline::logger::init(&config.general);
    RuleSet::from_config(&config, &AlgorithmRegistry::default()).unwrap()
}

#[test]
fn test_bind_and_route() {
    let rules = load_rules();
    let metadata = metadata(&rules);

    let statement = select_all(
        "t_order",
        Some(Expr::and(
            eq("user_id", literal(1)),
            eq("order_id", Expr::parameter(pos(), ParameterMarker::question(0))),
        )),
    );
    let (context, route) =
        bind_and_route(&statement, &metadata, &[Value::Integer(4)], &rules).unwrap();

    assert!(context.contains_enhanced_table());
    assert_eq!(route.len(), 1);
    let unit = &route.units()[0];
    assert_eq!(unit.data_source(), "ds_1");
    assert_eq!(unit.actual_table("t_order"), Some("t_order_0"));
    assert!(!route.requires_federation(&context));

    let statement = select_all("t_order", None);
    let (context, route) = bind_and_route(&statement, &metadata, &[], &rules).unwrap();
    assert_eq!(route.len(), 4);
    assert_eq!(route.actual_data_sources(), vec!["ds_0", "ds_1"]);
    let nodes: Vec<(&str, &str)> = route
        .units()
        .iter()
        .filter_map(|unit| Some((unit.data_source(), unit.actual_table("t_order")?)))
        .collect();
    assert_eq!(
        nodes,
        vec![
            ("ds_0", "t_order_0"),
            ("ds_0", "t_order_1"),
            ("ds_1", "t_order_0"),
            ("ds_1", "t_order_1"),
        ]
    );
    assert!(!route.requires_federation(&context));
}

#[test]
fn test_subqueries_route_by_outer_rows() {
    let rules = load_rules();
    let metadata = metadata(&rules);

    // SELECT (SELECT status FROM t_order WHERE ...) AS s, * FROM t_order
    let projection = ProjectionSegment::Subquery(SubqueryProjectionSegment {
        subquery: single_order(SubqueryKind::Projection),
        alias: Some(Identifier::new("s")),
    });
    let select = select_items(
        vec![projection, ProjectionSegment::shorthand(pos())],
        "t_order",
        None,
    );
    let statement = ParsedStatement::new("SELECT", Statement::Select(select));
    let (_, route) = bind_and_route(&statement, &metadata, &[], &rules).unwrap();
    assert_eq!(route.len(), 4);

    let exists = |not| {
        Expr::Exists(ExistsExpr {
            position: pos(),
            subquery: single_order(SubqueryKind::Exists),
            not,
        })
    };

    let statement = select_all("t_order", Some(exists(true)));
    let (_, route) = bind_and_route(&statement, &metadata, &[], &rules).unwrap();
    assert_eq!(route.len(), 4);

    let statement = select_all("t_order", Some(exists(false)));
    let (_, route) = bind_and_route(&statement, &metadata, &[], &rules).unwrap();
    assert_eq!(route.len(), 1);
    assert_eq!(route.units()[0].data_source(), "ds_1");
    assert_eq!(route.units()[0].actual_table("t_order"), Some("t_order_1"));
}

#[test]
fn test_hidden_columns_stay_out_of_shorthand() {
    let rules = load_rules();
    let schema = SchemaMetadata::new("public").with_table(TableMetadata::new(
        "t_order",
        vec![
            ColumnMetadata::new("order_id", "bigint").primary_key(),
            ColumnMetadata::new("user_id", "bigint"),
            ColumnMetadata::new("status", "varchar").hidden(),
        ],
    ));
    let metadata = Metadata::new()
        .with_database(DatabaseMetadata::new("logic_db", "public").with_schema(schema));

    let statement = select_all("t_order", Some(eq("status", literal("new"))));
    let (context, route) = bind_and_route(&statement, &metadata, &[], &rules).unwrap();
    assert_eq!(context.projections().column_labels(), vec!["order_id", "user_id"]);
    assert_eq!(route.len(), 4);
}

#[test]
fn test_errors_surface() {
    let rules = load_rules();
    let metadata = metadata(&rules);

    let statement = select_all("t_missing", None);
    let err = bind_and_route(&statement, &metadata, &[], &rules).unwrap_err();
    assert!(matches!(err, Error::Binder(_)));

    let statement = insert("t_order", &["order_id", "status"], vec![vec![literal(1), literal("new")]]);
    match bind_and_route(&statement, &metadata, &[], &rules) {
        Err(Error::Router(err)) => assert_eq!(err.kind(), ErrorKind::RoutingExhaustion),
        other => panic!("expected a routing error, got {:?}", other),
    }
}

#[test]
fn test_shadow_insert() {
    let rules = load_rules();
    let metadata = metadata(&rules);
    let router = Router::new(Arc::new(rules));

    let statement = insert(
        "t_user",
        &["user_id", "username"],
        vec![vec![literal(1), literal("jack")]],
    );
    let context = bind(&statement, &metadata, &[], "logic_db").unwrap();
    let route = router.route(&context).unwrap();
    assert!(route.shadow().is_shadow);
    assert_eq!(route.actual_data_sources(), vec!["ds_shadow_0"]);

    let statement = insert(
        "t_user",
        &["user_id", "username"],
        vec![vec![literal(2), literal("jill")]],
    )
    .with_comment(CommentSegment::new(pos(), "/* shadow: true, foo: bar */"));
    let context = bind(&statement, &metadata, &[], "logic_db").unwrap();
    let route = router.route(&context).unwrap();
    assert!(route.shadow().is_shadow);
    assert_eq!(route.actual_data_sources(), vec!["ds_shadow_0"]);

    let statement = insert(
        "t_user",
        &["user_id", "username"],
        vec![vec![literal(2), literal("jill")]],
    );
    let context = bind(&statement, &metadata, &[], "logic_db").unwrap();
    let route = router.route(&context).unwrap();
    assert!(!route.shadow().is_shadow);
    assert_eq!(route.actual_data_sources(), vec!["ds_0"]);

    // SELECT * FROM t_user WHERE NOT (user_id = 1)
    let negated = Expr::Not(NotExpr {
        position: pos(),
        expr: Box::new(eq("user_id", literal(1))),
    });
    let statement = select_all("t_user", Some(negated));
    let context = bind(&statement, &metadata, &[], "logic_db").unwrap();
    let route = router.route(&context).unwrap();
    assert!(!route.shadow().is_shadow);
    assert!(route.shadow().conditions.is_empty());
    assert_eq!(route.actual_data_sources(), vec!["ds_0"]);
}

#[test]
fn test_parallel_routing_with_publish() {
    let rules = Arc::new(RuleStore::new(load_rules()));
    let metadata = Arc::new(MetadataStore::new(metadata(&rules.load())));

    let handles = (0..4)
        .map(|user_id| {
            let rules = rules.clone();
            let metadata = metadata.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let statement = select_all("t_order", Some(eq("user_id", literal(user_id))));
                    let snapshot = metadata.load();
                    let context = bind(&statement, snapshot.as_ref(), &[], "logic_db").unwrap();
                    let route = Router::from_store(&rules).route(&context).unwrap();
                    let expected = format!("ds_{}", user_id % 2);
                    assert_eq!(route.actual_data_sources(), vec![expected.as_str()]);
                }
            })
        })
        .collect::<Vec<_>>();

    for _ in 0..10 {
        let config: Config = CONFIG.parse().unwrap();
        config.check();
        rules.reload(&config, &AlgorithmRegistry::default()).unwrap();
        metadata.update(|current| current.clone());
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(rules.load().version(), 10);
}
