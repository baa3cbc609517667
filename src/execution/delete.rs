use std::sync::Arc;

use crate::{
    catalog::{IndexInfo, TableInfo},
    error::{MinnowError, MinnowResult},
    storage::Tuple,
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    plan::{DeletePlan, OutputSchema},
};

/// Sink that tombstones every row its child produces and unregisters it
/// from every index on the table.
pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    plan: DeletePlan,
    child: Box<dyn Executor>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: DeletePlan) -> Self {
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
}

impl Executor for DeleteExecutor {
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
            MinnowError::TupleDeleteFailed("delete used before init".to_string())
        })?);

        self.child.init()?;
        while let Some((tuple, rid)) = self.child.next()? {
            table.heap.mark_delete(self.ctx.tx(), &rid)?;
            for index_info in &self.indexes {
                let key = tuple.key_from_tuple(index_info.index.key_attrs());
                index_info.index.delete_entry(self.ctx.tx(), &key, rid)?;
            }
        }
        Ok(None)
    }

    fn output(&self) -> &OutputSchema {
        &self.plan.output
    }
}
