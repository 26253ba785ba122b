//! Parameter expressions for schedule templates.
//!
//! Template fields are written as expressions over named calibration
//! symbols (`amp`, `σ`, `β`, `angle`, ...). Resolution binds every symbol to
//! a number and folds the expression down to an `f64`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{IrError, IrResult};

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A symbolic parameter.
    Symbol(String),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Check if this expression contains any symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Get all symbol names in this expression, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Evaluate the expression, resolving symbols through `lookup`.
    ///
    /// Fails with [`IrError::UnboundParameter`] for the first symbol the
    /// lookup cannot provide.
    pub fn evaluate<F>(&self, lookup: &F) -> IrResult<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            ParameterExpression::Constant(v) => Ok(*v),
            ParameterExpression::Pi => Ok(PI),
            ParameterExpression::Symbol(name) => {
                lookup(name).ok_or_else(|| IrError::UnboundParameter(name.clone()))
            }
            ParameterExpression::Neg(e) => Ok(-e.evaluate(lookup)?),
            ParameterExpression::Add(a, b) => Ok(a.evaluate(lookup)? + b.evaluate(lookup)?),
            ParameterExpression::Mul(a, b) => Ok(a.evaluate(lookup)? * b.evaluate(lookup)?),
            ParameterExpression::Div(a, b) => {
                let divisor = b.evaluate(lookup)?;
                if divisor == 0.0 {
                    return Err(IrError::DivisionByZero(self.to_string()));
                }
                Ok(a.evaluate(lookup)? / divisor)
            }
        }
    }

    /// Try to evaluate as a concrete f64 value.
    pub fn as_f64(&self) -> Option<f64> {
        self.evaluate(&|_| None).ok()
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Pi => write!(f, "π"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<&str> for ParameterExpression {
    fn from(name: &str) -> Self {
        ParameterExpression::Symbol(name.to_string())
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_symbol_unbound() {
        let p = ParameterExpression::symbol("β");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        let err = p.evaluate(&|_| None).unwrap_err();
        assert!(matches!(err, IrError::UnboundParameter(name) if name == "β"));
    }

    #[test]
    fn test_quarter_turn_offset() {
        // y12 angle: angle + π/2
        let expr = ParameterExpression::symbol("angle")
            + ParameterExpression::pi() / ParameterExpression::constant(2.0);
        let value = expr
            .evaluate(&|name| (name == "angle").then_some(0.25))
            .unwrap();
        assert!((value - (0.25 + PI / 2.0)).abs() < 1e-12);
        assert_eq!(expr.symbols().into_iter().collect::<Vec<_>>(), vec!["angle"]);
    }

    #[test]
    fn test_division_by_zero() {
        let expr = ParameterExpression::constant(1.0) / ParameterExpression::symbol("σ");
        assert!(matches!(
            expr.evaluate(&|_| Some(0.0)),
            Err(IrError::DivisionByZero(_))
        ));
    }
}
