//! # Subset Rules
//!
//! A small map-algebra language for subset elements. Rules reference
//! prerequisite grids with bracketed element ids and are parsed once into an
//! AST, then evaluated elementwise:
//!
//! ```text
//! [31.00] >= 2 and [31.00] <= 5
//! logical_or([12.00] == 1, abs([31.00] - 4) < 1)
//! ```
//!
//! Pure functions: no I/O, no raster store dependency.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use ndarray::Array2;

use crate::Result;
use ast::Expr;
pub use eval::Bindings;

/// A parsed subset rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    source: String,
    expr: Expr,
    placeholders: Vec<String>,
}

impl Rule {
    /// Parse a rule string.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = lexer::tokenize(source)?;
        let expr = parser::parse_rule(&tokens)?;
        let placeholders = expr.placeholders();
        Ok(Self { source: source.to_string(), expr, placeholders })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Element ids referenced by the rule, in order of first appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Evaluate to a boolean grid of `shape`; scalar results broadcast.
    pub fn evaluate(&self, bindings: &Bindings, shape: (usize, usize)) -> Result<Array2<bool>> {
        eval::evaluate_predicate(&self.expr, bindings, shape)
    }
}

impl std::str::FromStr for Rule {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Rule::parse(s)
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
