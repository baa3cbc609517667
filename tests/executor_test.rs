mod test_utils;

use std::{collections::HashMap, sync::Arc};

use minnow_db::{
    catalog::{Catalog, TableInfo},
    error::MinnowError,
    execution::{
        build_executor, execute_plan, AggregationPlan, AggregationType, CompareOp, DeletePlan,
        DistinctPlan, ExecutorContext, Expression, HashJoinPlan, InsertPlan, LimitPlan,
        NestedLoopJoinPlan, OutputSchema, PlanNode, SeqScanPlan, UpdateInfo, UpdateOp, UpdatePlan,
    },
    storage::{int64_schema, Cell, Field, FieldType, TableSchema},
    transaction::Transaction,
};
use test_utils::{new_engine, new_engine_with_config, setup};

fn create_table_with_rows(
    catalog: &Arc<Catalog>,
    ctx: &Arc<ExecutorContext>,
    name: &str,
    schema: TableSchema,
    rows: Vec<Vec<Cell>>,
) -> Arc<TableInfo> {
    let info = catalog.create_table(name, schema).unwrap();
    let plan = PlanNode::Insert(InsertPlan::raw(info.oid, rows));
    let out = execute_plan(ctx, &plan).unwrap();
    assert!(out.is_empty(), "insert is a sink");
    info
}

fn scan_all(info: &TableInfo) -> PlanNode {
    PlanNode::SeqScan(SeqScanPlan {
        table_oid: info.oid,
        predicate: None,
        output: OutputSchema::passthrough(info.schema.clone()),
    })
}

fn rows_of(tuples: Vec<minnow_db::Tuple>) -> Vec<Vec<Cell>> {
    let mut rows: Vec<Vec<Cell>> = tuples.into_iter().map(|t| t.cells().to_vec()).collect();
    rows.sort();
    rows
}

fn int(v: i64) -> Cell {
    Cell::Int64(v)
}

fn string(v: &str) -> Cell {
    Cell::String(v.to_string())
}

#[test]
fn test_seq_scan_with_predicate() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = create_table_with_rows(
        &catalog,
        &ctx,
        "numbers",
        int64_schema(2, "c"),
        (0..10i64).map(|i| vec![int(i), int(i * i)]).collect(),
    );

    let plan = PlanNode::SeqScan(SeqScanPlan {
        table_oid: info.oid,
        predicate: Some(Expression::compare(
            CompareOp::GtEq,
            Expression::column(1),
            Expression::Constant(int(25)),
        )),
        output: OutputSchema::passthrough(info.schema.clone()),
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(
        rows_of(result),
        (5..10i64)
            .map(|i| vec![int(i), int(i * i)])
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_insert_is_a_sink_and_runs_once() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = catalog.create_table("t", int64_schema(1, "c")).unwrap();

    let plan = PlanNode::Insert(InsertPlan::raw(info.oid, vec![vec![int(1)], vec![int(2)]]));
    let mut executor = build_executor(&ctx, &plan);
    executor.init().unwrap();
    assert!(executor.next().unwrap().is_none());
    // a drained sink stays drained; the rows are not inserted twice
    assert!(executor.next().unwrap().is_none());

    let result = execute_plan(&ctx, &scan_all(&info)).unwrap();
    assert_eq!(rows_of(result), vec![vec![int(1)], vec![int(2)]]);
}

#[test]
fn test_insert_maintains_indexes() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = catalog.create_table("users", int64_schema(2, "c")).unwrap();
    let index = catalog.create_index("users_c0", "users", vec![0]).unwrap();
    let tx = Transaction::new();

    let rows: Vec<Vec<Cell>> = (0..20i64).map(|i| vec![int(i), int(i + 100)]).collect();
    let plan = PlanNode::Insert(InsertPlan::raw(info.oid, rows));
    execute_plan(&ctx, &plan).unwrap();

    for i in 0..20i64 {
        let key = minnow_db::Tuple::new(vec![int(i)]);
        let rids = index.index.scan_key(&tx, &key).unwrap();
        assert_eq!(rids.len(), 1, "key {}", i);
        let stored = info.heap.get_tuple(&tx, &rids[0]).unwrap().unwrap();
        assert_eq!(stored.cells(), &[int(i), int(i + 100)]);
    }
}

#[test]
fn test_index_keys_wider_than_sixteen_bytes() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = catalog.create_table("t", int64_schema(2, "c")).unwrap();
    // two Int64 columns encode to 18 bytes, wider than one machine word
    let index = catalog.create_index("t_c0_c1", "t", vec![0, 1]).unwrap();
    let tx = Transaction::new();

    // the keys agree on every byte of a 16-byte prefix and differ only in
    // the high byte of the second column
    let a = 1i64;
    let b = 1i64 + (1i64 << 56);
    execute_plan(
        &ctx,
        &PlanNode::Insert(InsertPlan::raw(
            info.oid,
            vec![vec![int(1), int(a)], vec![int(1), int(b)]],
        )),
    )
    .unwrap();

    let key_a = minnow_db::Tuple::new(vec![int(1), int(a)]);
    let key_b = minnow_db::Tuple::new(vec![int(1), int(b)]);
    let rids_a = index.index.scan_key(&tx, &key_a).unwrap();
    let rids_b = index.index.scan_key(&tx, &key_b).unwrap();
    assert_eq!(rids_a.len(), 1);
    assert_eq!(rids_b.len(), 1);
    assert_ne!(rids_a[0], rids_b[0]);

    // each rid resolves to the row carrying its own key
    let row_a = info.heap.get_tuple(&tx, &rids_a[0]).unwrap().unwrap();
    assert_eq!(row_a.cell(1), Some(&int(a)));
    let row_b = info.heap.get_tuple(&tx, &rids_b[0]).unwrap().unwrap();
    assert_eq!(row_b.cell(1), Some(&int(b)));
}

#[test]
fn test_string_keyed_index() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let schema = TableSchema::new(vec![
        Field::new("name", FieldType::Varchar(30)),
        Field::new("v", FieldType::Int64),
    ]);
    let info = catalog.create_table("t", schema).unwrap();
    let index = catalog.create_index("t_name", "t", vec![0]).unwrap();
    let tx = Transaction::new();

    // long shared prefix, distinct tails
    let name_a = "shared-prefix-key-a";
    let name_b = "shared-prefix-key-b";
    execute_plan(
        &ctx,
        &PlanNode::Insert(InsertPlan::raw(
            info.oid,
            vec![
                vec![string(name_a), int(10)],
                vec![string(name_b), int(20)],
            ],
        )),
    )
    .unwrap();

    for (name, v) in [(name_a, 10i64), (name_b, 20i64)] {
        let key = minnow_db::Tuple::new(vec![string(name)]);
        let rids = index.index.scan_key(&tx, &key).unwrap();
        assert_eq!(rids.len(), 1, "key {}", name);
        let row = info.heap.get_tuple(&tx, &rids[0]).unwrap().unwrap();
        assert_eq!(row.cell(1), Some(&int(v)));
    }
}

#[test]
fn test_delete_removes_rows_and_index_entries() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = catalog.create_table("t", int64_schema(2, "c")).unwrap();
    let index = catalog.create_index("t_c0", "t", vec![0]).unwrap();
    let tx = Transaction::new();

    let rows: Vec<Vec<Cell>> = (0..10i64).map(|i| vec![int(i), int(i)]).collect();
    execute_plan(&ctx, &PlanNode::Insert(InsertPlan::raw(info.oid, rows))).unwrap();

    // delete the rows with c0 < 5
    let filtered = PlanNode::SeqScan(SeqScanPlan {
        table_oid: info.oid,
        predicate: Some(Expression::compare(
            CompareOp::Lt,
            Expression::column(0),
            Expression::Constant(int(5)),
        )),
        output: OutputSchema::passthrough(info.schema.clone()),
    });
    let plan = PlanNode::Delete(DeletePlan::new(info.oid, filtered));
    execute_plan(&ctx, &plan).unwrap();

    let remaining = execute_plan(&ctx, &scan_all(&info)).unwrap();
    assert_eq!(
        rows_of(remaining),
        (5..10i64).map(|i| vec![int(i), int(i)]).collect::<Vec<_>>()
    );

    for i in 0..5i64 {
        let key = minnow_db::Tuple::new(vec![int(i)]);
        assert!(index.index.scan_key(&tx, &key).unwrap().is_empty());
    }
    for i in 5..10i64 {
        let key = minnow_db::Tuple::new(vec![int(i)]);
        assert_eq!(index.index.scan_key(&tx, &key).unwrap().len(), 1);
    }
}

#[test]
fn test_update_set_and_add() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = catalog.create_table("t", int64_schema(2, "c")).unwrap();
    let index = catalog.create_index("t_c0", "t", vec![0]).unwrap();
    let tx = Transaction::new();

    let rows: Vec<Vec<Cell>> = (0..5i64).map(|i| vec![int(i), int(0)]).collect();
    execute_plan(&ctx, &PlanNode::Insert(InsertPlan::raw(info.oid, rows))).unwrap();

    // c0 += 10, c1 = 7 for every row
    let mut updates = HashMap::new();
    updates.insert(
        0,
        UpdateInfo {
            op: UpdateOp::Add,
            value: int(10),
        },
    );
    updates.insert(
        1,
        UpdateInfo {
            op: UpdateOp::Set,
            value: int(7),
        },
    );
    let plan = PlanNode::Update(UpdatePlan::new(info.oid, updates, scan_all(&info)));
    execute_plan(&ctx, &plan).unwrap();

    let result = execute_plan(&ctx, &scan_all(&info)).unwrap();
    assert_eq!(
        rows_of(result),
        (10..15i64).map(|i| vec![int(i), int(7)]).collect::<Vec<_>>()
    );

    // index entries moved from the old keys to the new ones
    for i in 0..5i64 {
        let old_key = minnow_db::Tuple::new(vec![int(i)]);
        assert!(index.index.scan_key(&tx, &old_key).unwrap().is_empty());
        let new_key = minnow_db::Tuple::new(vec![int(i + 10)]);
        assert_eq!(index.index.scan_key(&tx, &new_key).unwrap().len(), 1);
    }
}

fn join_test_tables(
    catalog: &Arc<Catalog>,
    ctx: &Arc<ExecutorContext>,
) -> (Arc<TableInfo>, Arc<TableInfo>) {
    let left_schema = TableSchema::new(vec![
        Field::new("id", FieldType::Int64),
        Field::new("name", FieldType::Varchar(8)),
    ]);
    let right_schema = TableSchema::new(vec![
        Field::new("id", FieldType::Int64),
        Field::new("tag", FieldType::Varchar(8)),
    ]);

    let left = create_table_with_rows(
        catalog,
        ctx,
        "left_rows",
        left_schema,
        vec![
            vec![int(1), string("a")],
            vec![int(2), string("b")],
            vec![int(1), string("c")],
        ],
    );
    let right = create_table_with_rows(
        catalog,
        ctx,
        "right_rows",
        right_schema,
        vec![vec![int(1), string("x")], vec![int(3), string("y")]],
    );
    (left, right)
}

fn join_output() -> OutputSchema {
    OutputSchema::new(
        TableSchema::new(vec![
            Field::new("name", FieldType::Varchar(8)),
            Field::new("tag", FieldType::Varchar(8)),
        ]),
        vec![Expression::join_column(0, 1), Expression::join_column(1, 1)],
    )
}

#[test]
fn test_hash_join() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let (left, right) = join_test_tables(&catalog, &ctx);

    let plan = PlanNode::HashJoin(HashJoinPlan {
        left: Box::new(scan_all(&left)),
        right: Box::new(scan_all(&right)),
        left_key: Expression::column(0),
        right_key: Expression::column(0),
        output: join_output(),
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(
        rows_of(result),
        vec![
            vec![string("a"), string("x")],
            vec![string("c"), string("x")],
        ]
    );
}

#[test]
fn test_hash_join_null_keys_never_match() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let schema = TableSchema::new(vec![
        Field::new("id", FieldType::Int64),
        Field::new("name", FieldType::Varchar(8)),
    ]);
    let left = create_table_with_rows(
        &catalog,
        &ctx,
        "l",
        schema.clone(),
        vec![vec![Cell::Null, string("ln")], vec![int(1), string("la")]],
    );
    let right = create_table_with_rows(
        &catalog,
        &ctx,
        "r",
        schema,
        vec![vec![Cell::Null, string("rn")], vec![int(1), string("ra")]],
    );

    let plan = PlanNode::HashJoin(HashJoinPlan {
        left: Box::new(scan_all(&left)),
        right: Box::new(scan_all(&right)),
        left_key: Expression::column(0),
        right_key: Expression::column(0),
        output: join_output(),
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    // only the non-null keys pair up
    assert_eq!(rows_of(result), vec![vec![string("la"), string("ra")]]);
}

#[test]
fn test_nested_loop_join() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let (left, right) = join_test_tables(&catalog, &ctx);

    let plan = PlanNode::NestedLoopJoin(NestedLoopJoinPlan {
        left: Box::new(scan_all(&left)),
        right: Box::new(scan_all(&right)),
        predicate: Some(Expression::compare(
            CompareOp::Eq,
            Expression::join_column(0, 0),
            Expression::join_column(1, 0),
        )),
        output: join_output(),
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(
        rows_of(result),
        vec![
            vec![string("a"), string("x")],
            vec![string("c"), string("x")],
        ]
    );
}

#[test]
fn test_nested_loop_join_requires_predicate() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let (left, right) = join_test_tables(&catalog, &ctx);

    let plan = PlanNode::NestedLoopJoin(NestedLoopJoinPlan {
        left: Box::new(scan_all(&left)),
        right: Box::new(scan_all(&right)),
        predicate: None,
        output: join_output(),
    });

    match execute_plan(&ctx, &plan) {
        Err(MinnowError::NullPredicate) => {}
        other => panic!("expected NullPredicate, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_aggregation_with_group_by() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let schema = TableSchema::new(vec![
        Field::new("k", FieldType::Varchar(8)),
        Field::new("v", FieldType::Int64),
    ]);
    let info = create_table_with_rows(
        &catalog,
        &ctx,
        "t",
        schema,
        vec![
            vec![string("A"), int(1)],
            vec![string("A"), int(2)],
            vec![string("B"), int(5)],
        ],
    );

    let output = OutputSchema::new(
        TableSchema::new(vec![
            Field::new("k", FieldType::Varchar(8)),
            Field::new("count", FieldType::Int64),
            Field::new("sum", FieldType::Int64),
        ]),
        vec![
            Expression::GroupBy(0),
            Expression::Aggregate(0),
            Expression::Aggregate(1),
        ],
    );
    let plan = PlanNode::Aggregation(AggregationPlan {
        child: Box::new(scan_all(&info)),
        group_bys: vec![Expression::column(0)],
        aggregates: vec![Expression::Constant(int(1)), Expression::column(1)],
        agg_types: vec![AggregationType::Count, AggregationType::Sum],
        having: None,
        output,
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(
        rows_of(result),
        vec![
            vec![string("A"), int(2), int(3)],
            vec![string("B"), int(1), int(5)],
        ]
    );
}

#[test]
fn test_aggregation_having_filters_groups() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let schema = TableSchema::new(vec![
        Field::new("k", FieldType::Varchar(8)),
        Field::new("v", FieldType::Int64),
    ]);
    let info = create_table_with_rows(
        &catalog,
        &ctx,
        "t",
        schema,
        vec![
            vec![string("A"), int(1)],
            vec![string("A"), int(2)],
            vec![string("B"), int(5)],
        ],
    );

    let output = OutputSchema::new(
        TableSchema::new(vec![
            Field::new("k", FieldType::Varchar(8)),
            Field::new("count", FieldType::Int64),
        ]),
        vec![Expression::GroupBy(0), Expression::Aggregate(0)],
    );
    let plan = PlanNode::Aggregation(AggregationPlan {
        child: Box::new(scan_all(&info)),
        group_bys: vec![Expression::column(0)],
        aggregates: vec![Expression::Constant(int(1))],
        agg_types: vec![AggregationType::Count],
        having: Some(Expression::compare(
            CompareOp::GtEq,
            Expression::Aggregate(0),
            Expression::Constant(int(2)),
        )),
        output,
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(rows_of(result), vec![vec![string("A"), int(2)]]);
}

#[test]
fn test_min_max_aggregates() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = create_table_with_rows(
        &catalog,
        &ctx,
        "t",
        int64_schema(1, "c"),
        vec![vec![int(4)], vec![int(-2)], vec![int(9)]],
    );

    let output = OutputSchema::new(
        int64_schema(2, "agg"),
        vec![Expression::Aggregate(0), Expression::Aggregate(1)],
    );
    let plan = PlanNode::Aggregation(AggregationPlan {
        child: Box::new(scan_all(&info)),
        group_bys: vec![],
        aggregates: vec![Expression::column(0), Expression::column(0)],
        agg_types: vec![AggregationType::Min, AggregationType::Max],
        having: None,
        output,
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(rows_of(result), vec![vec![int(-2), int(9)]]);
}

#[test]
fn test_distinct() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = create_table_with_rows(
        &catalog,
        &ctx,
        "t",
        int64_schema(1, "c"),
        vec![vec![int(1)], vec![int(2)], vec![int(1)], vec![int(3)], vec![int(2)]],
    );

    let plan = PlanNode::Distinct(DistinctPlan {
        child: Box::new(scan_all(&info)),
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(rows_of(result), vec![vec![int(1)], vec![int(2)], vec![int(3)]]);
}

#[test]
fn test_limit() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let info = create_table_with_rows(
        &catalog,
        &ctx,
        "t",
        int64_schema(1, "c"),
        (0..10i64).map(|i| vec![int(i)]).collect(),
    );

    let plan = PlanNode::Limit(LimitPlan {
        child: Box::new(scan_all(&info)),
        limit: 4,
    });

    let result = execute_plan(&ctx, &plan).unwrap();
    assert_eq!(result.len(), 4);
}

#[test]
fn test_query_over_parallel_pool() {
    setup();
    let (_dir, catalog, ctx) = new_engine_with_config(minnow_db::EngineConfig {
        pool_size: 8,
        num_instances: 3,
        ..minnow_db::EngineConfig::default()
    });
    let info = create_table_with_rows(
        &catalog,
        &ctx,
        "t",
        int64_schema(1, "c"),
        (0..50i64).map(|i| vec![int(i)]).collect(),
    );
    catalog.create_index("t_c0", "t", vec![0]).unwrap();

    // the whole stack (heap, index, directory, buckets) shards cleanly
    execute_plan(
        &ctx,
        &PlanNode::Insert(InsertPlan::raw(
            info.oid,
            (50..60i64).map(|i| vec![int(i)]).collect(),
        )),
    )
    .unwrap();

    let result = execute_plan(&ctx, &scan_all(&info)).unwrap();
    assert_eq!(
        rows_of(result),
        (0..60i64).map(|i| vec![int(i)]).collect::<Vec<_>>()
    );
}

#[test]
fn test_pipelined_insert_from_scan() {
    setup();
    let (_dir, catalog, ctx) = new_engine(32);
    let source = create_table_with_rows(
        &catalog,
        &ctx,
        "source",
        int64_schema(1, "c"),
        (0..5i64).map(|i| vec![int(i)]).collect(),
    );
    let target = catalog.create_table("target", int64_schema(1, "c")).unwrap();

    let plan = PlanNode::Insert(InsertPlan::from_child(target.oid, scan_all(&source)));
    execute_plan(&ctx, &plan).unwrap();

    let result = execute_plan(&ctx, &scan_all(&target)).unwrap();
    assert_eq!(rows_of(result), (0..5i64).map(|i| vec![int(i)]).collect::<Vec<_>>());
}
