mod aggregation;
mod delete;
mod distinct;
mod executor;
mod expression;
mod hash_join;
mod insert;
mod limit;
mod nested_loop_join;
mod plan;
mod seq_scan;
mod update;

pub use aggregation::AggregationExecutor;
pub use delete::DeleteExecutor;
pub use distinct::DistinctExecutor;
pub use executor::{build_executor, execute_plan, Executor, ExecutorContext};
pub use expression::{is_true, CompareOp, Expression};
pub use hash_join::HashJoinExecutor;
pub use insert::InsertExecutor;
pub use limit::LimitExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use plan::{
    AggregationPlan, AggregationType, DeletePlan, DistinctPlan, HashJoinPlan, InsertPlan,
    InsertSource, LimitPlan, NestedLoopJoinPlan, OutputSchema, PlanNode, SeqScanPlan, UpdateInfo,
    UpdateOp, UpdatePlan,
};
pub use seq_scan::SeqScanExecutor;
pub use update::UpdateExecutor;
