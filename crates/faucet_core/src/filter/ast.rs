//! Filter DSL abstract syntax tree (§4.5).

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl Literal {
    pub fn into_value(self) -> Value {
        match self {
            Literal::String(s) => Value::Text(s),
            Literal::Number(n) => Value::Float64(n),
            Literal::Bool(b) => Value::Bool(b),
            Literal::Null => Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        ident: String,
        op: CompareOp,
        value: Literal,
    },
    In {
        ident: String,
        values: Vec<Literal>,
    },
    IsNull {
        ident: String,
        negated: bool,
    },
    Between {
        ident: String,
        low: Literal,
        high: Literal,
    },
    Like {
        ident: String,
        pattern: String,
        negated: bool,
    },
    Contains {
        ident: String,
        substring: String,
    },
}
