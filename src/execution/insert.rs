use std::sync::Arc;

use crate::{
    catalog::{IndexInfo, TableInfo},
    error::{MinnowError, MinnowResult},
    storage::Tuple,
    types::Rid,
};

use super::{
    executor::{build_executor, Executor, ExecutorContext},
    plan::{InsertPlan, InsertSource, OutputSchema},
};

/// Sink that appends rows to a table and registers them with every index on
/// it. Consumes its whole input on the first `next` call and emits nothing.
pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    plan: InsertPlan,
    child: Option<Box<dyn Executor>>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    done: bool,
}

impl InsertExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: InsertPlan) -> Self {
        let child = match &plan.source {
            InsertSource::Child(child_plan) => Some(build_executor(&ctx, child_plan)),
            InsertSource::Raw(_) => None,
        };
        Self {
            ctx,
            plan,
            child,
            table: None,
            indexes: Vec::new(),
            done: false,
        }
    }

    fn insert_row(&self, table: &TableInfo, tuple: &Tuple) -> MinnowResult {
        let rid = table.heap.insert_tuple(self.ctx.tx(), tuple)?;
        for index_info in &self.indexes {
            let key = tuple.key_from_tuple(index_info.index.key_attrs());
            index_info.index.insert_entry(self.ctx.tx(), &key, rid)?;
        }
        Ok(())
    }
}

impl Executor for InsertExecutor {
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
            MinnowError::TupleInsertFailed("insert used before init".to_string())
        })?);

        match &self.plan.source {
            InsertSource::Raw(rows) => {
                for row in rows.clone() {
                    self.insert_row(&table, &Tuple::new(row))?;
                }
            }
            InsertSource::Child(_) => {
                let mut child = self.child.take().ok_or_else(|| {
                    MinnowError::TupleInsertFailed("insert has no child executor".to_string())
                })?;
                child.init()?;
                while let Some((tuple, _rid)) = child.next()? {
                    self.insert_row(&table, &tuple)?;
                }
                self.child = Some(child);
            }
        }
        Ok(None)
    }

    fn output(&self) -> &OutputSchema {
        &self.plan.output
    }
}
