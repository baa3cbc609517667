use std::sync::Arc;

use crate::{
    buffer::BufferPool,
    catalog::Catalog,
    error::{MinnowError, MinnowResult},
    storage::Tuple,
    transaction::Transaction,
    types::Rid,
};

use super::{
    aggregation::AggregationExecutor,
    delete::DeleteExecutor,
    distinct::DistinctExecutor,
    hash_join::HashJoinExecutor,
    insert::InsertExecutor,
    limit::LimitExecutor,
    nested_loop_join::NestedLoopJoinExecutor,
    plan::{OutputSchema, PlanNode},
    seq_scan::SeqScanExecutor,
    update::UpdateExecutor,
};

/// Shared state every executor in one query tree sees.
pub struct ExecutorContext {
    catalog: Arc<Catalog>,
    bpm: Arc<dyn BufferPool>,
    tx: Transaction,
}

impl ExecutorContext {
    pub fn new(catalog: Arc<Catalog>, bpm: Arc<dyn BufferPool>, tx: Transaction) -> Self {
        Self { catalog, bpm, tx }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn bpm(&self) -> &Arc<dyn BufferPool> {
        &self.bpm
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }
}

/// The pull-model iterator contract.
///
/// `init` primes iteration state and may fully materialize a child
/// (aggregation, hash-join build side); it is safe to call again to restart.
/// `next` yields one output row at a time until it returns `Ok(None)`.
pub trait Executor {
    fn init(&mut self) -> MinnowResult;

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError>;

    fn output(&self) -> &OutputSchema;
}

/// Mirror the plan tree with a tree of executors, bottom-up.
pub fn build_executor(ctx: &Arc<ExecutorContext>, plan: &PlanNode) -> Box<dyn Executor> {
    match plan {
        PlanNode::SeqScan(p) => Box::new(SeqScanExecutor::new(Arc::clone(ctx), p.clone())),
        PlanNode::Insert(p) => Box::new(InsertExecutor::new(Arc::clone(ctx), p.clone())),
        PlanNode::Delete(p) => Box::new(DeleteExecutor::new(Arc::clone(ctx), p.clone())),
        PlanNode::Update(p) => Box::new(UpdateExecutor::new(Arc::clone(ctx), p.clone())),
        PlanNode::NestedLoopJoin(p) => {
            Box::new(NestedLoopJoinExecutor::new(Arc::clone(ctx), p.clone()))
        }
        PlanNode::HashJoin(p) => Box::new(HashJoinExecutor::new(Arc::clone(ctx), p.clone())),
        PlanNode::Aggregation(p) => Box::new(AggregationExecutor::new(Arc::clone(ctx), p.clone())),
        PlanNode::Distinct(p) => Box::new(DistinctExecutor::new(Arc::clone(ctx), p.clone())),
        PlanNode::Limit(p) => Box::new(LimitExecutor::new(Arc::clone(ctx), p.clone())),
    }
}

/// Build, init and drain a plan, collecting the emitted tuples.
pub fn execute_plan(
    ctx: &Arc<ExecutorContext>,
    plan: &PlanNode,
) -> Result<Vec<Tuple>, MinnowError> {
    let mut executor = build_executor(ctx, plan);
    executor.init()?;
    let mut rows = Vec::new();
    while let Some((tuple, _rid)) = executor.next()? {
        rows.push(tuple);
    }
    Ok(rows)
}
