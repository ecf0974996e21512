use std::cmp::Ordering;

use crate::context::EvaluationContext;
use crate::error::{Diagnostic, ErrorCode};
use crate::expander;
use crate::expr::{BinaryOp, LogicalOp, Node, NodeKind};
use crate::value::{LiteralValue, Version};

/// Reduces a parsed condition to a boolean against an [`EvaluationContext`].
///
/// `and`/`or` short-circuit: the right operand is not evaluated (no lookups,
/// no function calls) once the left one decides the result. A chain is one
/// flat node whose operands are walked in a loop.
pub struct Evaluator<'a> {
    context: &'a dyn EvaluationContext,
}

impl<'a> Evaluator<'a> {

    pub fn new(context: &'a dyn EvaluationContext) -> Self {
        Evaluator { context }
    }

    /// Evaluates `node` in boolean position.
    pub fn evaluate(&self, node: &Node) -> Result<bool, Diagnostic> {
        match &node.kind {
            NodeKind::Logical { op, operands } => self.logical(*op, operands),
            NodeKind::Not(operand) => Ok(!self.evaluate(operand)?),
            NodeKind::Binary { op, left, right } => self.comparison(*op, left, right),
            _ => {
                let value = self.value(node)?;
                value.as_bool().ok_or_else(|| Self::expected_boolean(node, &value))
            }
        }
    }

    /// Evaluates `node` to a value without coercing it.
    pub fn value(&self, node: &Node) -> Result<LiteralValue, Diagnostic> {
        let value = match &node.kind {
            NodeKind::Literal { value, .. } => value.clone(),
            NodeKind::ExpandableString(text) => LiteralValue::Str(expander::expand(text, self.context)),
            NodeKind::PropertyRef(name) => LiteralValue::Str(expander::property(name, self.context)),
            NodeKind::ItemListRef(body) => LiteralValue::Str(expander::item_list(body, self.context)),
            NodeKind::MetadataRef(body) => LiteralValue::Str(expander::metadata(body, self.context)),
            NodeKind::FunctionCall { name, args } => {
                let args = args.iter().map(|arg| self.value(arg)).collect::<Result<Vec<_>, _>>()?;
                tracing::trace!(function = %name, args = args.len(), "calling condition function");
                self.context
                    .call_function(name, &args)
                    .map_err(|e| e.placed_at(node.offset + 1))?
            }
            NodeKind::Not(_) | NodeKind::Binary { .. } | NodeKind::Logical { .. } => {
                LiteralValue::Bool(self.evaluate(node)?)
            }
        };
        Ok(value)
    }

    /// Text used by `==`/`!=`. Literals compare by their source text.
    fn text(&self, node: &Node) -> Result<String, Diagnostic> {
        match &node.kind {
            NodeKind::Literal { text, .. } => Ok(text.clone()),
            _ => Ok(self.value(node)?.as_text()),
        }
    }

    fn logical(&self, op: LogicalOp, operands: &[Node]) -> Result<bool, Diagnostic> {
        let decisive = op == LogicalOp::Or;
        for operand in operands {
            if self.evaluate(operand)? == decisive {
                return Ok(decisive);
            }
        }
        Ok(!decisive)
    }

    fn comparison(&self, op: BinaryOp, left: &Node, right: &Node) -> Result<bool, Diagnostic> {
        match op {
            BinaryOp::EqualTo | BinaryOp::NotEqualTo => {
                let equal = self.text(left)?.to_lowercase() == self.text(right)?.to_lowercase();
                Ok(equal == (op == BinaryOp::EqualTo))
            }
            _ => {
                let ordering = self.order(left, right)?;
                Ok(match op {
                    BinaryOp::LessThan => ordering == Some(Ordering::Less),
                    BinaryOp::LessThanOrEqualTo => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    BinaryOp::GreaterThan => ordering == Some(Ordering::Greater),
                    _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                })
            }
        }
    }

    /// Orders two operands as dotted versions if both are shaped that way,
    /// else as numbers if both are numbers.
    fn order(&self, left: &Node, right: &Node) -> Result<Option<Ordering>, Diagnostic> {
        let left_value = self.value(left)?;
        let right_value = self.value(right)?;

        if let (Some(l), Some(r)) = (Self::version(left, &left_value), Self::version(right, &right_value)) {
            return Ok(Some(l.cmp(&r)));
        }
        if let (Some(l), Some(r)) = (left_value.as_number(), right_value.as_number()) {
            return Ok(l.partial_cmp(&r));
        }

        let comparable = |node: &Node, value: &LiteralValue| value.as_number().is_some() || Self::version(node, value).is_some();
        let (node, value) = if comparable(left, &left_value) { (right, right_value) } else { (left, left_value) };
        Err(Diagnostic::found(ErrorCode::ComparisonOnNonNumericExpression, node.offset + 1, value.as_text()))
    }

    /// Literals are read as versions from their source text, so `1.10` stays
    /// distinct from `1.1`.
    fn version(node: &Node, value: &LiteralValue) -> Option<Version> {
        match &node.kind {
            NodeKind::Literal { text, .. } => Version::parse(text),
            _ => value.as_version(),
        }
    }

    fn expected_boolean(node: &Node, value: &LiteralValue) -> Diagnostic {
        Diagnostic::found(ErrorCode::ExpectedBooleanInCondition, node.offset + 1, value.as_text())
    }
}
