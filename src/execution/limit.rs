use std::sync::Arc;

use crate::{
    error::{MinnowError, MinnowResult},
    storage::Tuple,
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    plan::{LimitPlan, OutputSchema},
};

/// Passes rows through until `limit` have been produced.
pub struct LimitExecutor {
    plan: LimitPlan,
    child: Box<dyn Executor>,
    emitted: usize,
}

impl LimitExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: LimitPlan) -> Self {
        let child = build_executor(&ctx, &plan.child);
        Self {
            plan,
            child,
            emitted: 0,
        }
    }
}

impl Executor for LimitExecutor {
    fn init(&mut self) -> MinnowResult {
        self.emitted = 0;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError> {
        if self.emitted >= self.plan.limit {
            return Ok(None);
        }
        match self.child.next()? {
            Some(out) => {
                self.emitted += 1;
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    fn output(&self) -> &OutputSchema {
        self.child.output()
    }
}
