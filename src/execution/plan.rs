use std::collections::HashMap;

use crate::{
    error::MinnowError,
    storage::{Cell, TableSchema, Tuple},
    types::TableOid,
};

use super::expression::Expression;

/// An executor's output shape: the schema plus one expression per column,
/// so emitted tuples always match the column order downstream nodes expect.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    schema: TableSchema,
    exprs: Vec<Expression>,
}

impl OutputSchema {
    pub fn new(schema: TableSchema, exprs: Vec<Expression>) -> Self {
        assert_eq!(
            schema.len(),
            exprs.len(),
            "one output expression per output column"
        );
        Self { schema, exprs }
    }

    /// Output equal to the input: column `i` reads column `i`.
    pub fn passthrough(schema: TableSchema) -> Self {
        let exprs = (0..schema.len()).map(Expression::column).collect();
        Self { schema, exprs }
    }

    /// The empty output of a sink node.
    pub fn empty() -> Self {
        Self {
            schema: TableSchema::new(Vec::new()),
            exprs: Vec::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn exprs(&self) -> &[Expression] {
        &self.exprs
    }

    pub fn project(&self, tuple: &Tuple) -> Result<Tuple, MinnowError> {
        let cells = self
            .exprs
            .iter()
            .map(|e| e.evaluate(tuple))
            .collect::<Result<Vec<Cell>, MinnowError>>()?;
        Ok(Tuple::new(cells))
    }

    pub fn project_join(&self, left: &Tuple, right: &Tuple) -> Result<Tuple, MinnowError> {
        let cells = self
            .exprs
            .iter()
            .map(|e| e.evaluate_join(left, right))
            .collect::<Result<Vec<Cell>, MinnowError>>()?;
        Ok(Tuple::new(cells))
    }

    pub fn project_aggregate(
        &self,
        group_bys: &[Cell],
        aggregates: &[Cell],
    ) -> Result<Tuple, MinnowError> {
        let cells = self
            .exprs
            .iter()
            .map(|e| e.evaluate_aggregate(group_bys, aggregates))
            .collect::<Result<Vec<Cell>, MinnowError>>()?;
        Ok(Tuple::new(cells))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Set,
    Add,
}

/// Per-column change applied by an update plan.
#[derive(Debug, Clone)]
pub struct UpdateInfo {
    pub op: UpdateOp,
    pub value: Cell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    Count,
    Sum,
    Min,
    Max,
}

/// Rows an insert draws from: literal values in the plan, or a child plan's
/// output stream.
#[derive(Debug, Clone)]
pub enum InsertSource {
    Raw(Vec<Vec<Cell>>),
    Child(Box<PlanNode>),
}

#[derive(Debug, Clone)]
pub struct SeqScanPlan {
    pub table_oid: TableOid,
    pub predicate: Option<Expression>,
    pub output: OutputSchema,
}

#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub table_oid: TableOid,
    pub source: InsertSource,
    pub output: OutputSchema,
}

impl InsertPlan {
    pub fn raw(table_oid: TableOid, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            table_oid,
            source: InsertSource::Raw(rows),
            output: OutputSchema::empty(),
        }
    }

    pub fn from_child(table_oid: TableOid, child: PlanNode) -> Self {
        Self {
            table_oid,
            source: InsertSource::Child(Box::new(child)),
            output: OutputSchema::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub table_oid: TableOid,
    pub child: Box<PlanNode>,
    pub output: OutputSchema,
}

impl DeletePlan {
    pub fn new(table_oid: TableOid, child: PlanNode) -> Self {
        Self {
            table_oid,
            child: Box::new(child),
            output: OutputSchema::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub table_oid: TableOid,
    pub updates: HashMap<usize, UpdateInfo>,
    pub child: Box<PlanNode>,
    pub output: OutputSchema,
}

impl UpdatePlan {
    pub fn new(table_oid: TableOid, updates: HashMap<usize, UpdateInfo>, child: PlanNode) -> Self {
        Self {
            table_oid,
            updates,
            child: Box::new(child),
            output: OutputSchema::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NestedLoopJoinPlan {
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
    pub predicate: Option<Expression>,
    pub output: OutputSchema,
}

#[derive(Debug, Clone)]
pub struct HashJoinPlan {
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
    /// Key computed from a left tuple during the build phase.
    pub left_key: Expression,
    /// Key computed from a right tuple during the probe phase.
    pub right_key: Expression,
    pub output: OutputSchema,
}

#[derive(Debug, Clone)]
pub struct AggregationPlan {
    pub child: Box<PlanNode>,
    pub group_bys: Vec<Expression>,
    pub aggregates: Vec<Expression>,
    pub agg_types: Vec<AggregationType>,
    pub having: Option<Expression>,
    pub output: OutputSchema,
}

#[derive(Debug, Clone)]
pub struct DistinctPlan {
    pub child: Box<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct LimitPlan {
    pub child: Box<PlanNode>,
    pub limit: usize,
}

/// The immutable tree the planner hands to the executor factory.
#[derive(Debug, Clone)]
pub enum PlanNode {
    SeqScan(SeqScanPlan),
    Insert(InsertPlan),
    Delete(DeletePlan),
    Update(UpdatePlan),
    NestedLoopJoin(NestedLoopJoinPlan),
    HashJoin(HashJoinPlan),
    Aggregation(AggregationPlan),
    Distinct(DistinctPlan),
    Limit(LimitPlan),
}

impl PlanNode {
    pub fn output(&self) -> &OutputSchema {
        match self {
            PlanNode::SeqScan(p) => &p.output,
            PlanNode::Insert(p) => &p.output,
            PlanNode::Delete(p) => &p.output,
            PlanNode::Update(p) => &p.output,
            PlanNode::NestedLoopJoin(p) => &p.output,
            PlanNode::HashJoin(p) => &p.output,
            PlanNode::Aggregation(p) => &p.output,
            PlanNode::Distinct(p) => p.child.output(),
            PlanNode::Limit(p) => p.child.output(),
        }
    }
}
