use std::sync::Arc;

use crate::{
    catalog::{IndexInfo, TableInfo},
    error::{MinnowError, MinnowResult},
    storage::Tuple,
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    plan::{OutputSchema, UpdateOp, UpdatePlan},
};

/// Sink that rewrites every row its child produces, applying per-column
/// set/add changes in place and refreshing every index on the table.
pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    plan: UpdatePlan,
    child: Box<dyn Executor>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: UpdatePlan) -> Self {
        let child = build_executor(&ctx, &plan.child);
        Self {
            ctx,
            plan,
            child,
            table: None,
            indexes: Vec::new(),
            done: false,
        }
    }

    fn generate_updated_tuple(&self, src: &Tuple) -> Result<Tuple, MinnowError> {
        let mut cells = Vec::with_capacity(src.len());
        for (idx, cell) in src.cells().iter().enumerate() {
            match self.plan.updates.get(&idx) {
                None => cells.push(cell.clone()),
                Some(info) => match info.op {
                    UpdateOp::Set => cells.push(info.value.clone()),
                    UpdateOp::Add => {
                        let sum = cell.checked_add(&info.value).ok_or_else(|| {
                            MinnowError::TupleUpdateFailed(format!(
                                "cannot add {} to column {}",
                                info.value, idx
                            ))
                        })?;
                        cells.push(sum);
                    }
                },
            }
        }
        Ok(Tuple::new(cells))
    }
}

impl Executor for UpdateExecutor {
    fn init(&mut self) -> MinnowResult {
        let table = self.ctx.catalog().get_table(self.plan.table_oid).ok_or_else(|| {
            MinnowError::OutOfRange(format!("no table with oid {}", self.plan.table_oid))
        })?;
        self.indexes = self.ctx.catalog().get_table_indexes(&table.name);
        self.table = Some(table);
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>, MinnowError> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let table = Arc::clone(self.table.as_ref().ok_or_else(|| {
            MinnowError::TupleUpdateFailed("update used before init".to_string())
        })?);

        self.child.init()?;
        while let Some((tuple, rid)) = self.child.next()? {
            let updated = self.generate_updated_tuple(&tuple)?;
            table.heap.update_tuple(self.ctx.tx(), &updated, &rid)?;

            for index_info in &self.indexes {
                let old_key = tuple.key_from_tuple(index_info.index.key_attrs());
                let new_key = updated.key_from_tuple(index_info.index.key_attrs());
                index_info.index.delete_entry(self.ctx.tx(), &old_key, rid)?;
                index_info.index.insert_entry(self.ctx.tx(), &new_key, rid)?;
            }
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
    use crate::storage::Cell;

    #[test]
    fn test_add_requires_matching_types() {
        assert_eq!(
            Cell::Int64(5).checked_add(&Cell::Int64(2)),
            Some(Cell::Int64(7))
        );
        assert_eq!(Cell::String("a".into()).checked_add(&Cell::Int64(2)), None);
        // overflow surfaces as a failed update, not a wrapped value
        assert_eq!(Cell::Int64(i64::MAX).checked_add(&Cell::Int64(1)), None);
    }
}
