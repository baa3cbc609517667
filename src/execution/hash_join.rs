use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use crate::{
    error::{MinnowError, MinnowResult},
    storage::{Cell, Tuple},
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    plan::{HashJoinPlan, OutputSchema},
};

/// Equi-join: `init` materializes the left child into a key -> rows
/// multimap, `next` probes it with each right row. Equality is
/// value-equality of the join key; a null key matches nothing on either
/// side.
pub struct HashJoinExecutor {
    plan: HashJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    build_table: HashMap<Cell, Vec<Tuple>>,
    probe_tuple: Option<Tuple>,
    pending_matches: VecDeque<Tuple>,
}

impl HashJoinExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: HashJoinPlan) -> Self {
        let left = build_executor(&ctx, &plan.left);
        let right = build_executor(&ctx, &plan.right);
        Self {
            plan,
            left,
            right,
            build_table: HashMap::new(),
            probe_tuple: None,
            pending_matches: VecDeque::new(),
        }
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> MinnowResult {
        self.build_table.clear();
        self.probe_tuple = None;
        self.pending_matches.clear();

        self.left.init()?;
        while let Some((tuple, _rid)) = self.left.next()? {
            let key = self.plan.left_key.evaluate(&tuple)?;
            if key.is_null() {
                continue;
            }
            self.build_table.entry(key).or_default().push(tuple);
        }

        self.right.init()?;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError> {
        loop {
            if let Some(left_row) = self.pending_matches.pop_front() {
                if let Some(right_tuple) = &self.probe_tuple {
                    let joined = self.plan.output.project_join(&left_row, right_tuple)?;
                    return Ok(Some((joined, Rid::INVALID)));
                }
            }

            match self.right.next()? {
                Some((tuple, _rid)) => {
                    let key = self.plan.right_key.evaluate(&tuple)?;
                    if !key.is_null() {
                        if let Some(matches) = self.build_table.get(&key) {
                            self.pending_matches = matches.iter().cloned().collect();
                        }
                    }
                    self.probe_tuple = Some(tuple);
                }
                None => return Ok(None),
            }
        }
    }

    fn output(&self) -> &OutputSchema {
        &self.plan.output
    }
}
