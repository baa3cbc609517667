use crate::{
    error::MinnowError,
    storage::{Cell, Tuple},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// A scalar expression tree, evaluated against a tuple, a pair of join
/// tuples, or a group's key and aggregate vectors.
///
/// `Column { tuple_idx: 0, .. }` reads the (left) input tuple;
/// `tuple_idx: 1` reads the right join input. `GroupBy`/`Aggregate` are only
/// meaningful during aggregate evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Cell),
    Column { tuple_idx: usize, col_idx: usize },
    GroupBy(usize),
    Aggregate(usize),
    Compare {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn column(col_idx: usize) -> Expression {
        Expression::Column {
            tuple_idx: 0,
            col_idx,
        }
    }

    pub fn join_column(tuple_idx: usize, col_idx: usize) -> Expression {
        Expression::Column { tuple_idx, col_idx }
    }

    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Expression {
        Expression::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn evaluate(&self, tuple: &Tuple) -> Result<Cell, MinnowError> {
        self.eval(Some(tuple), None, &[], &[])
    }

    pub fn evaluate_join(&self, left: &Tuple, right: &Tuple) -> Result<Cell, MinnowError> {
        self.eval(Some(left), Some(right), &[], &[])
    }

    pub fn evaluate_aggregate(
        &self,
        group_bys: &[Cell],
        aggregates: &[Cell],
    ) -> Result<Cell, MinnowError> {
        self.eval(None, None, group_bys, aggregates)
    }

    fn eval(
        &self,
        left: Option<&Tuple>,
        right: Option<&Tuple>,
        group_bys: &[Cell],
        aggregates: &[Cell],
    ) -> Result<Cell, MinnowError> {
        match self {
            Expression::Constant(cell) => Ok(cell.clone()),

            Expression::Column { tuple_idx, col_idx } => {
                let tuple = match tuple_idx {
                    0 => left,
                    1 => right,
                    _ => None,
                }
                .ok_or_else(|| {
                    MinnowError::OutOfRange(format!("no input tuple at index {}", tuple_idx))
                })?;
                tuple.cell(*col_idx).cloned().ok_or_else(|| {
                    MinnowError::OutOfRange(format!("no column {} in tuple", col_idx))
                })
            }

            Expression::GroupBy(idx) => group_bys.get(*idx).cloned().ok_or_else(|| {
                MinnowError::OutOfRange(format!("no group-by value {}", idx))
            }),

            Expression::Aggregate(idx) => aggregates.get(*idx).cloned().ok_or_else(|| {
                MinnowError::OutOfRange(format!("no aggregate value {}", idx))
            }),

            Expression::Compare { op, left: l, right: r } => {
                let a = l.eval(left, right, group_bys, aggregates)?;
                let b = r.eval(left, right, group_bys, aggregates)?;
                Ok(compare_cells(*op, &a, &b))
            }

            Expression::And(l, r) => {
                let a = l.eval(left, right, group_bys, aggregates)?;
                let b = r.eval(left, right, group_bys, aggregates)?;
                Ok(match (truth(&a), truth(&b)) {
                    (Some(false), _) | (_, Some(false)) => Cell::Bool(false),
                    (Some(true), Some(true)) => Cell::Bool(true),
                    _ => Cell::Null,
                })
            }

            Expression::Or(l, r) => {
                let a = l.eval(left, right, group_bys, aggregates)?;
                let b = r.eval(left, right, group_bys, aggregates)?;
                Ok(match (truth(&a), truth(&b)) {
                    (Some(true), _) | (_, Some(true)) => Cell::Bool(true),
                    (Some(false), Some(false)) => Cell::Bool(false),
                    _ => Cell::Null,
                })
            }
        }
    }
}

fn truth(cell: &Cell) -> Option<bool> {
    match cell {
        Cell::Bool(v) => Some(*v),
        _ => None,
    }
}

/// A comparison touching null yields null, which predicates treat as not
/// satisfied.
fn compare_cells(op: CompareOp, a: &Cell, b: &Cell) -> Cell {
    if a.is_null() || b.is_null() {
        return Cell::Null;
    }
    let ordering = a.cmp(b);
    let result = match op {
        CompareOp::Eq => a == b,
        CompareOp::NotEq => a != b,
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::LtEq => ordering.is_le(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::GtEq => ordering.is_ge(),
    };
    Cell::Bool(result)
}

/// Whether a predicate result keeps the row.
pub fn is_true(cell: &Cell) -> bool {
    matches!(cell, Cell::Bool(true))
}
