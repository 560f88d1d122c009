// SPDX-License-Identifier: Apache-2.0

//! Typed constraint trees and their evaluation.
//!
//! The expression parser produces an untyped [`Expr`]; [`lower`] turns it
//! into a [`Predicate`] (boolean tree) over [`ScalarExpr`] (arithmetic tree),
//! rejecting constraints that mix the two layers illegally. After lowering,
//! evaluation is total: arithmetic follows IEEE-754 (division by zero yields
//! an infinity, NaN propagates), ordered comparisons involving NaN are false
//! and `!=` is true for NaN operands.

use crate::expr::{BinOp, Expr, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Arithmetic subtree; evaluates to a real number.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    Const(f64),
    /// Coordinate reference, bounds-checked against the declared
    /// dimensionality during lowering.
    Var(usize),
    Neg(Box<ScalarExpr>),
    Binary {
        op: ArithOp,
        lhs: Box<ScalarExpr>,
        rhs: Box<ScalarExpr>,
    },
}

/// Boolean tree; the top-level form of every constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Cmp {
        op: CmpOp,
        lhs: ScalarExpr,
        rhs: ScalarExpr,
    },
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl ScalarExpr {
    pub fn eval(&self, x: &[f64]) -> f64 {
        match self {
            ScalarExpr::Const(value) => *value,
            // Indices are checked against the dimensionality at lowering
            // time; a shorter vector reads NaN and fails the enclosing
            // comparison instead of panicking.
            ScalarExpr::Var(index) => x.get(*index).copied().unwrap_or(f64::NAN),
            ScalarExpr::Neg(operand) => -operand.eval(x),
            ScalarExpr::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(x);
                let rhs = rhs.eval(x);
                match op {
                    ArithOp::Add => lhs + rhs,
                    ArithOp::Sub => lhs - rhs,
                    ArithOp::Mul => lhs * rhs,
                    ArithOp::Div => lhs / rhs,
                }
            }
        }
    }
}

impl Predicate {
    pub fn eval(&self, x: &[f64]) -> bool {
        match self {
            Predicate::Cmp { op, lhs, rhs } => {
                let lhs = lhs.eval(x);
                let rhs = rhs.eval(x);
                match op {
                    CmpOp::Lt => lhs < rhs,
                    CmpOp::Le => lhs <= rhs,
                    CmpOp::Gt => lhs > rhs,
                    CmpOp::Ge => lhs >= rhs,
                    CmpOp::Eq => lhs == rhs,
                    CmpOp::Ne => lhs != rhs,
                }
            }
            Predicate::Not(operand) => !operand.eval(x),
            Predicate::And(lhs, rhs) => lhs.eval(x) && rhs.eval(x),
            Predicate::Or(lhs, rhs) => lhs.eval(x) || rhs.eval(x),
        }
    }
}

/// Errors that can arise while lowering an untyped expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    /// An arithmetic value appeared where a boolean was required (e.g. the
    /// whole constraint is `x0 + x1`).
    ExpectedBoolean { expr: String },
    /// A comparison or boolean subtree appeared inside arithmetic.
    ExpectedScalar { expr: String },
    /// Comparisons do not chain; `a < b < c` must be written out with `and`.
    ChainedComparison { expr: String },
    /// A variable name is not of the form `x<index>`.
    UnknownVariable { name: String },
    /// A variable index is outside the declared dimensionality.
    VariableOutOfRange { name: String, dims: usize },
}

impl std::fmt::Display for LowerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LowerError::ExpectedBoolean { expr } => {
                write!(f, "expected a boolean expression, got arithmetic: {}", expr)
            }
            LowerError::ExpectedScalar { expr } => {
                write!(f, "expected an arithmetic expression, got boolean: {}", expr)
            }
            LowerError::ChainedComparison { expr } => {
                write!(
                    f,
                    "comparisons do not chain; split {} into two comparisons joined by 'and'",
                    expr
                )
            }
            LowerError::UnknownVariable { name } => {
                write!(f, "unknown variable '{}'; variables are x0, x1, ...", name)
            }
            LowerError::VariableOutOfRange { name, dims } => {
                write!(
                    f,
                    "variable '{}' is out of range for dimensionality {} (valid: x0..x{})",
                    name,
                    dims,
                    dims.saturating_sub(1)
                )
            }
        }
    }
}

impl std::error::Error for LowerError {}

/// Lowers a parsed constraint expression into a typed predicate over vectors
/// of the given dimensionality.
pub fn lower(expr: &Expr, dims: usize) -> Result<Predicate, LowerError> {
    lower_predicate(expr, dims)
}

fn lower_predicate(expr: &Expr, dims: usize) -> Result<Predicate, LowerError> {
    match expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => Ok(Predicate::Not(Box::new(lower_predicate(operand, dims)?))),
        Expr::Binary { op, lhs, rhs } => match op {
            BinOp::And => Ok(Predicate::And(
                Box::new(lower_predicate(lhs, dims)?),
                Box::new(lower_predicate(rhs, dims)?),
            )),
            BinOp::Or => Ok(Predicate::Or(
                Box::new(lower_predicate(lhs, dims)?),
                Box::new(lower_predicate(rhs, dims)?),
            )),
            BinOp::Lt => lower_cmp(CmpOp::Lt, expr, lhs, rhs, dims),
            BinOp::Le => lower_cmp(CmpOp::Le, expr, lhs, rhs, dims),
            BinOp::Gt => lower_cmp(CmpOp::Gt, expr, lhs, rhs, dims),
            BinOp::Ge => lower_cmp(CmpOp::Ge, expr, lhs, rhs, dims),
            BinOp::Eq => lower_cmp(CmpOp::Eq, expr, lhs, rhs, dims),
            BinOp::Ne => lower_cmp(CmpOp::Ne, expr, lhs, rhs, dims),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => Err(LowerError::ExpectedBoolean {
                expr: expr.to_string(),
            }),
        },
        Expr::Number(..) | Expr::Var(..) | Expr::Unary { .. } => Err(LowerError::ExpectedBoolean {
            expr: expr.to_string(),
        }),
    }
}

fn lower_cmp(
    op: CmpOp,
    whole: &Expr,
    lhs: &Expr,
    rhs: &Expr,
    dims: usize,
) -> Result<Predicate, LowerError> {
    // `a < b < c` parses left-associated, so the chain shows up as a
    // comparison in our own lhs position.
    if matches!(lhs, Expr::Binary { op, .. } if op.is_cmp()) {
        return Err(LowerError::ChainedComparison {
            expr: whole.to_string(),
        });
    }
    Ok(Predicate::Cmp {
        op,
        lhs: lower_scalar(lhs, dims)?,
        rhs: lower_scalar(rhs, dims)?,
    })
}

fn lower_scalar(expr: &Expr, dims: usize) -> Result<ScalarExpr, LowerError> {
    match expr {
        Expr::Number(value) => Ok(ScalarExpr::Const(*value)),
        Expr::Var(name) => Ok(ScalarExpr::Var(var_index(name, dims)?)),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Ok(ScalarExpr::Neg(Box::new(lower_scalar(operand, dims)?))),
        Expr::Unary {
            op: UnaryOp::Not, ..
        } => Err(LowerError::ExpectedScalar {
            expr: expr.to_string(),
        }),
        Expr::Binary { op, lhs, rhs } => match op {
            BinOp::Add => lower_arith(ArithOp::Add, lhs, rhs, dims),
            BinOp::Sub => lower_arith(ArithOp::Sub, lhs, rhs, dims),
            BinOp::Mul => lower_arith(ArithOp::Mul, lhs, rhs, dims),
            BinOp::Div => lower_arith(ArithOp::Div, lhs, rhs, dims),
            _ => Err(LowerError::ExpectedScalar {
                expr: expr.to_string(),
            }),
        },
    }
}

fn lower_arith(
    op: ArithOp,
    lhs: &Expr,
    rhs: &Expr,
    dims: usize,
) -> Result<ScalarExpr, LowerError> {
    Ok(ScalarExpr::Binary {
        op,
        lhs: Box::new(lower_scalar(lhs, dims)?),
        rhs: Box::new(lower_scalar(rhs, dims)?),
    })
}

fn var_index(name: &str, dims: usize) -> Result<usize, LowerError> {
    let digits = name.strip_prefix('x').ok_or_else(|| LowerError::UnknownVariable {
        name: name.to_string(),
    })?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LowerError::UnknownVariable {
            name: name.to_string(),
        });
    }
    let index: usize = digits.parse().map_err(|_| LowerError::UnknownVariable {
        name: name.to_string(),
    })?;
    if index >= dims {
        return Err(LowerError::VariableOutOfRange {
            name: name.to_string(),
            dims,
        });
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr_parser::parse_expression;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn lowered(input: &str, dims: usize) -> Predicate {
        lower(&parse_expression(input).unwrap(), dims).unwrap()
    }

    fn eval(input: &str, x: &[f64]) -> bool {
        lowered(input, x.len()).eval(x)
    }

    #[test_case("x0 + x1 <= 1.0", &[0.3, 0.4], true; "sum within budget")]
    #[test_case("x0 + x1 <= 1.0", &[0.7, 0.4], false; "sum over budget")]
    #[test_case("x0 * 2 > x1", &[0.3, 0.5], true; "product comparison")]
    #[test_case("x0 - x1 == 0.0", &[0.25, 0.25], true; "difference equality")]
    #[test_case("-x0 < 0.0", &[0.5], true; "unary negation")]
    #[test_case("x0 != x1", &[0.5, 0.5], false; "inequality on equal values")]
    fn evaluates_comparisons(input: &str, x: &[f64], expected: bool) {
        assert_eq!(eval(input, x), expected);
    }

    #[test_case("x0 < 0.5 and x1 < 0.5", &[0.4, 0.4], true; "and both hold")]
    #[test_case("x0 < 0.5 and x1 < 0.5", &[0.4, 0.6], false; "and one fails")]
    #[test_case("x0 < 0.2 or x1 < 0.2", &[0.9, 0.1], true; "or second holds")]
    #[test_case("not (x0 > 0.5)", &[0.4], true; "not")]
    #[test_case("not (x0 > 0.5 and x1 > 0.5)", &[0.9, 0.2], true; "not over and")]
    fn evaluates_boolean_operators(input: &str, x: &[f64], expected: bool) {
        assert_eq!(eval(input, x), expected);
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        // 0.5 / 0 == +inf, so the comparison holds.
        assert!(eval("x0 / x1 > 100.0", &[0.5, 0.0]));
        // 0 / 0 == NaN; ordered comparisons with NaN are false.
        assert!(!eval("x0 / x1 > 0.0", &[0.0, 0.0]));
        assert!(!eval("x0 / x1 <= 0.0", &[0.0, 0.0]));
    }

    #[test]
    fn short_vector_reads_nan_and_fails_comparison() {
        let p = lowered("x1 <= 0.5", 2);
        assert!(!p.eval(&[0.3]));
    }

    #[test_case("x0 + x1"; "bare arithmetic")]
    #[test_case("x0"; "bare variable")]
    #[test_case("0.5"; "bare number")]
    #[test_case("(x0 < 1) + x1 <= 1"; "comparison inside sum lhs")]
    fn rejects_type_invalid_constraints(input: &str) {
        let expr = parse_expression(input).unwrap();
        let err = lower(&expr, 2).unwrap_err();
        assert!(
            matches!(
                err,
                LowerError::ExpectedBoolean { .. } | LowerError::ExpectedScalar { .. }
            ),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn rejects_chained_comparison() {
        let expr = parse_expression("0.1 < x0 < 0.9").unwrap();
        let err = lower(&expr, 1).unwrap_err();
        assert_eq!(
            err,
            LowerError::ChainedComparison {
                expr: "((0.1 < x0) < 0.9)".to_string()
            }
        );
    }

    #[test]
    fn rejects_not_inside_arithmetic() {
        let expr = parse_expression("x0 + (not x1 < 1) <= 1").unwrap();
        let err = lower(&expr, 2).unwrap_err();
        assert!(matches!(err, LowerError::ExpectedScalar { .. }), "{}", err);
    }

    #[test_case("y0 < 1", "y0"; "wrong letter")]
    #[test_case("x < 1", "x"; "missing index")]
    #[test_case("x1y < 1", "x1y"; "trailing letters")]
    fn rejects_unknown_variables(input: &str, name: &str) {
        let expr = parse_expression(input).unwrap();
        assert_eq!(
            lower(&expr, 4).unwrap_err(),
            LowerError::UnknownVariable {
                name: name.to_string()
            }
        );
    }

    #[test]
    fn rejects_out_of_range_variable() {
        let expr = parse_expression("x2 < 1").unwrap();
        assert_eq!(
            lower(&expr, 2).unwrap_err(),
            LowerError::VariableOutOfRange {
                name: "x2".to_string(),
                dims: 2
            }
        );
    }

    #[test]
    fn accepts_highest_valid_variable() {
        let p = lowered("x1 <= 1.0", 2);
        assert!(p.eval(&[0.0, 0.5]));
    }
}
