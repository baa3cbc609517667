use std::sync::Arc;

use crate::{
    error::{MinnowError, MinnowResult},
    storage::{TableIterator, Tuple},
    types::Rid,
};

use super::{
    executor::{Executor, ExecutorContext},
    expression::is_true,
    plan::{OutputSchema, SeqScanPlan},
};

/// Walks a table heap in iterator order, filtering through the optional
/// predicate and projecting survivors through the output schema.
pub struct SeqScanExecutor {
    ctx: Arc<ExecutorContext>,
    plan: SeqScanPlan,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: SeqScanPlan) -> Self {
        Self {
            ctx,
            plan,
            iter: None,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> MinnowResult {
        let table = self.ctx.catalog().get_table(self.plan.table_oid).ok_or_else(|| {
            MinnowError::OutOfRange(format!("no table with oid {}", self.plan.table_oid))
        })?;
        self.iter = Some(table.heap.iter(self.ctx.tx()));
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError> {
        let iter = self.iter.as_mut().ok_or_else(|| {
            MinnowError::NullResult("sequential scan used before init".to_string())
        })?;

        for (tuple, rid) in iter.by_ref() {
            if let Some(predicate) = &self.plan.predicate {
                if !is_true(&predicate.evaluate(&tuple)?) {
                    continue;
                }
            }
            let projected = self.plan.output.project(&tuple)?;
            return Ok(Some((projected, rid)));
        }
        Ok(None)
    }

    fn output(&self) -> &OutputSchema {
        &self.plan.output
    }
}
