use std::fmt;

use crate::token_type::TokenKind;
use crate::value::LiteralValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum LogicalOp {
    #[strum(to_string = "or")]
    Or,
    #[strum(to_string = "and")]
    And,
}

/// Comparison operators. Neither kind chains: `a == b == c` does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum BinaryOp {
    #[strum(to_string = "==")]
    EqualTo,
    #[strum(to_string = "!=")]
    NotEqualTo,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = "<=")]
    LessThanOrEqualTo,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = ">=")]
    GreaterThanOrEqualTo,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<BinaryOp> {
        let op = match kind {
            TokenKind::EqualTo => BinaryOp::EqualTo,
            TokenKind::NotEqualTo => BinaryOp::NotEqualTo,
            TokenKind::LessThan => BinaryOp::LessThan,
            TokenKind::LessThanOrEqualTo => BinaryOp::LessThanOrEqualTo,
            TokenKind::GreaterThan => BinaryOp::GreaterThan,
            TokenKind::GreaterThanOrEqualTo => BinaryOp::GreaterThanOrEqualTo,
            _ => return None,
        };
        Some(op)
    }
}

/// A node of the expression tree. `offset` is the 0-based char index of the
/// first character of the construct in the condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `text` is the source lexeme (quote-less), kept for text comparisons.
    Literal { value: LiteralValue, text: String },
    /// Quoted text holding references or escapes, expanded at evaluation.
    ExpandableString(String),
    PropertyRef(String),
    ItemListRef(String),
    MetadataRef(String),
    FunctionCall { name: String, args: Vec<Node> },
    Not(Box<Node>),
    Binary { op: BinaryOp, left: Box<Node>, right: Box<Node> },
    /// A whole `a or b or c` chain. Operands are kept flat, so only
    /// parentheses, function arguments and `!` make the tree deeper.
    Logical { op: LogicalOp, operands: Vec<Node> },
}

impl Node {
    pub fn new(kind: NodeKind, offset: usize) -> Self {
        Node { kind, offset }
    }

    pub fn literal(value: LiteralValue, text: impl Into<String>, offset: usize) -> Self {
        Node::new(NodeKind::Literal { value, text: text.into() }, offset)
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        let offset = left.offset;
        Node::new(NodeKind::Binary { op, left: Box::new(left), right: Box::new(right) }, offset)
    }

    /// Joins `operands` with `op`. A single operand is returned as is.
    pub fn logical(op: LogicalOp, mut operands: Vec<Node>) -> Self {
        if operands.len() == 1 {
            if let Some(only) = operands.pop() {
                return only;
            }
        }
        let offset = operands.first().map_or(0, |first| first.offset);
        Node::new(NodeKind::Logical { op, operands }, offset)
    }
}

/// Prints the tree fully parenthesised, e.g. `(($(a) == 'b') and (!true))`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match &self.kind {
            NodeKind::Literal { value: LiteralValue::Str(_), text } => write!(f, "'{}'", text),
            NodeKind::Literal { text, .. } => write!(f, "{}", text),
            NodeKind::ExpandableString(text) => write!(f, "'{}'", text),
            NodeKind::PropertyRef(name) => write!(f, "$({})", name),
            NodeKind::ItemListRef(body) => write!(f, "@({})", body),
            NodeKind::MetadataRef(body) => write!(f, "%({})", body),
            NodeKind::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            NodeKind::Not(operand) => write!(f, "(!{})", operand),
            NodeKind::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            NodeKind::Logical { op, operands } => {
                write!(f, "(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write!(f, "{}", operand)?;
                }
                write!(f, ")")
            }
        }
    }
}
