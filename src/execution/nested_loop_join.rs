use std::sync::Arc;

use crate::{
    error::{MinnowError, MinnowResult},
    storage::Tuple,
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    expression::is_true,
    plan::{NestedLoopJoinPlan, OutputSchema},
};

/// Checks every right row against the current left row, restarting the
/// right child for each left advance. Joined rows carry no heap position,
/// so the emitted RID is invalid.
pub struct NestedLoopJoinExecutor {
    plan: NestedLoopJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    left_tuple: Option<Tuple>,
}

impl NestedLoopJoinExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: NestedLoopJoinPlan) -> Self {
        let left = build_executor(&ctx, &plan.left);
        let right = build_executor(&ctx, &plan.right);
        Self {
            plan,
            left,
            right,
            left_tuple: None,
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> MinnowResult {
        // a join without a predicate is a planner bug; fail before pulling
        if self.plan.predicate.is_none() {
            return Err(MinnowError::NullPredicate);
        }
        self.left.init()?;
        self.left_tuple = self.left.next()?.map(|(tuple, _rid)| tuple);
        self.right.init()?;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError> {
        let predicate = self
            .plan
            .predicate
            .clone()
            .ok_or(MinnowError::NullPredicate)?;

        loop {
            let left_tuple = match &self.left_tuple {
                Some(tuple) => tuple.clone(),
                None => return Ok(None),
            };

            while let Some((right_tuple, _rid)) = self.right.next()? {
                if is_true(&predicate.evaluate_join(&left_tuple, &right_tuple)?) {
                    let joined = self.plan.output.project_join(&left_tuple, &right_tuple)?;
                    return Ok(Some((joined, Rid::INVALID)));
                }
            }

            // right side exhausted for this left row; rewind and advance
            self.right.init()?;
            self.left_tuple = self.left.next()?.map(|(tuple, _rid)| tuple);
        }
    }

    fn output(&self) -> &OutputSchema {
        &self.plan.output
    }
}
