//! Rule AST.
//!
//! Pure data: placeholders name prerequisite elements, functions are resolved
//! to [`Function`] at parse time so evaluation never sees an unknown name.

/// Expression in a subset rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// `True` / `False`
    Bool(bool),
    /// `[31.00]`: the grid of a prerequisite element
    Placeholder(String),
    /// `logical_and(a, b)`, `where(c, x, y)`, ...
    Call { function: Function, args: Vec<Expr> },
    /// `a + b`, `a >= b`, `a and b`
    BinaryOp { left: Box<Expr>, op: BinaryOp, right: Box<Expr> },
    /// `not a`, `~a`, `-a`
    UnaryOp { op: UnaryOp, expr: Box<Expr> },
}

/// Binary operators. `&` and `|` are the elementwise spellings of `And`/`Or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add, Sub, Mul, Div, Mod, Pow,
    // Comparison
    Eq, Neq, Lt, Lte, Gt, Gte,
    // Logical
    And, Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Elementwise array functions available to rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    LogicalNot,
    Where,
    Abs,
    Minimum,
    Maximum,
    Sqrt,
    Floor,
    Ceil,
    Round,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "logical_and" => Function::LogicalAnd,
            "logical_or" => Function::LogicalOr,
            "logical_xor" => Function::LogicalXor,
            "logical_not" => Function::LogicalNot,
            "where" => Function::Where,
            "abs" | "absolute" => Function::Abs,
            "minimum" => Function::Minimum,
            "maximum" => Function::Maximum,
            "sqrt" => Function::Sqrt,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "round" | "rint" => Function::Round,
            _ => return None,
        };
        Some(f)
    }

    /// Accepted argument counts: `(min, max)`, `None` meaning unbounded.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::LogicalAnd | Function::LogicalOr | Function::LogicalXor => (2, None),
            Function::Minimum | Function::Maximum => (2, Some(2)),
            Function::Where => (3, Some(3)),
            Function::LogicalNot
            | Function::Abs
            | Function::Sqrt
            | Function::Floor
            | Function::Ceil
            | Function::Round => (1, Some(1)),
        }
    }
}

impl Expr {
    /// Collect placeholder ids in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_placeholders(&mut out);
        out
    }

    fn collect_placeholders(&self, out: &mut Vec<String>) {
        match self {
            Expr::Placeholder(id) => {
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_placeholders(out)),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_placeholders(out);
                right.collect_placeholders(out);
            }
            Expr::UnaryOp { expr, .. } => expr.collect_placeholders(out),
            Expr::Number(_) | Expr::Bool(_) => {}
        }
    }
}
