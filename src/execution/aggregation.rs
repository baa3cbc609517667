use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{MinnowError, MinnowResult},
    storage::{Cell, Tuple},
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    expression::is_true,
    plan::{AggregationPlan, AggregationType, OutputSchema},
};

/// In-memory aggregation table: one running value vector per distinct
/// group-by key.
struct AggregationHashTable {
    agg_types: Vec<AggregationType>,
    groups: HashMap<Vec<Cell>, Vec<Cell>>,
}

impl AggregationHashTable {
    fn new(agg_types: Vec<AggregationType>) -> Self {
        Self {
            agg_types,
            groups: HashMap::new(),
        }
    }

    fn initial_values(agg_types: &[AggregationType]) -> Vec<Cell> {
        agg_types
            .iter()
            .map(|agg_type| match agg_type {
                AggregationType::Count => Cell::Int64(0),
                // the first non-null input seeds sum, min and max
                AggregationType::Sum | AggregationType::Min | AggregationType::Max => Cell::Null,
            })
            .collect()
    }

    /// Fold one input row into the group's running aggregates. A sum that
    /// overflows i64 fails the query rather than wrapping.
    fn insert_combine(&mut self, key: Vec<Cell>, inputs: Vec<Cell>) -> MinnowResult {
        let values = self
            .groups
            .entry(key)
            .or_insert_with(|| Self::initial_values(&self.agg_types));

        for (i, agg_type) in self.agg_types.iter().enumerate() {
            let input = &inputs[i];
            let acc = &mut values[i];
            match agg_type {
                AggregationType::Count => {
                    if let Cell::Int64(n) = acc {
                        *n += 1;
                    }
                }
                AggregationType::Sum => {
                    if !input.is_null() {
                        *acc = if acc.is_null() {
                            input.clone()
                        } else {
                            acc.checked_add(input).ok_or_else(|| {
                                MinnowError::OutOfRange(format!(
                                    "sum aggregate overflowed adding {}",
                                    input
                                ))
                            })?
                        };
                    }
                }
                AggregationType::Min => {
                    if !input.is_null() && (acc.is_null() || input < acc) {
                        *acc = input.clone();
                    }
                }
                AggregationType::Max => {
                    if !input.is_null() && (acc.is_null() || input > acc) {
                        *acc = input.clone();
                    }
                }
            }
        }
        Ok(())
    }

    fn into_groups(self) -> Vec<(Vec<Cell>, Vec<Cell>)> {
        self.groups.into_iter().collect()
    }
}

/// Blocking aggregation: `init` drains the child into the aggregation
/// table, `next` walks the finished groups, applying the optional `HAVING`
/// filter before projecting.
pub struct AggregationExecutor {
    plan: AggregationPlan,
    child: Box<dyn Executor>,
    groups: Vec<(Vec<Cell>, Vec<Cell>)>,
    cursor: usize,
}

impl AggregationExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: AggregationPlan) -> Self {
        let child = build_executor(&ctx, &plan.child);
        Self {
            plan,
            child,
            groups: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> MinnowResult {
        let mut table = AggregationHashTable::new(self.plan.agg_types.clone());

        self.child.init()?;
        while let Some((tuple, _rid)) = self.child.next()? {
            let key = self
                .plan
                .group_bys
                .iter()
                .map(|e| e.evaluate(&tuple))
                .collect::<Result<Vec<Cell>, MinnowError>>()?;
            let inputs = self
                .plan
                .aggregates
                .iter()
                .map(|e| e.evaluate(&tuple))
                .collect::<Result<Vec<Cell>, MinnowError>>()?;
            table.insert_combine(key, inputs)?;
        }

        self.groups = table.into_groups();
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError> {
        while self.cursor < self.groups.len() {
            let (group_bys, aggregates) = &self.groups[self.cursor];
            self.cursor += 1;

            if let Some(having) = &self.plan.having {
                if !is_true(&having.evaluate_aggregate(group_bys, aggregates)?) {
                    continue;
                }
            }

            let tuple = self.plan.output.project_aggregate(group_bys, aggregates)?;
            return Ok(Some((tuple, Rid::INVALID)));
        }
        Ok(None)
    }

    fn output(&self) -> &OutputSchema {
        &self.plan.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_rules() {
        let mut table = AggregationHashTable::new(vec![
            AggregationType::Count,
            AggregationType::Sum,
            AggregationType::Min,
            AggregationType::Max,
        ]);
        let key = vec![Cell::String("g".to_string())];

        for v in [3i64, 1, 2] {
            table
                .insert_combine(
                    key.clone(),
                    vec![
                        Cell::Int64(1),
                        Cell::Int64(v),
                        Cell::Int64(v),
                        Cell::Int64(v),
                    ],
                )
                .unwrap();
        }
        // null inputs count but do not affect sum/min/max
        table
            .insert_combine(key.clone(), vec![Cell::Int64(1), Cell::Null, Cell::Null, Cell::Null])
            .unwrap();

        let groups = table.into_groups();
        assert_eq!(groups.len(), 1);
        let (_, values) = &groups[0];
        assert_eq!(
            values,
            &vec![
                Cell::Int64(4),
                Cell::Int64(6),
                Cell::Int64(1),
                Cell::Int64(3)
            ]
        );
    }

    #[test]
    fn test_sum_overflow_fails_the_fold() {
        let mut table = AggregationHashTable::new(vec![AggregationType::Sum]);
        let key = vec![Cell::String("g".to_string())];

        table
            .insert_combine(key.clone(), vec![Cell::Int64(i64::MAX)])
            .unwrap();
        assert!(table
            .insert_combine(key, vec![Cell::Int64(1)])
            .is_err());
    }
}
