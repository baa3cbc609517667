use std::{collections::HashSet, sync::Arc};

use crate::{
    error::{MinnowError, MinnowResult},
    storage::{Cell, Tuple},
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    plan::{DistinctPlan, OutputSchema},
};

/// Emits the first occurrence of each distinct row, keyed by the child's
/// full projected output.
pub struct DistinctExecutor {
    child: Box<dyn Executor>,
    seen: HashSet<Vec<Cell>>,
}

impl DistinctExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: DistinctPlan) -> Self {
        let child = build_executor(&ctx, &plan.child);
        Self {
            child,
            seen: HashSet::new(),
        }
    }
}

impl Executor for DistinctExecutor {
    fn init(&mut self) -> MinnowResult {
        self.seen.clear();
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError> {
        while let Some((tuple, rid)) = self.child.next()? {
            if self.seen.insert(tuple.cells().to_vec()) {
                return Ok(Some((tuple, rid)));
            }
        }
        Ok(None)
    }

    fn output(&self) -> &OutputSchema {
        self.child.output()
    }
}
