/// A recursive descent parser for build-file conditions.
///
/// Grammar of conditions, loosest binding first:
///
/// expr -> and_expr ( "or" and_expr )*
/// and_expr -> not_expr ( "and" not_expr )*
/// not_expr -> "!" not_expr | equality
/// equality -> relational ( ( "==" | "!=" ) relational )?
/// relational -> primary ( ( "<" | "<=" | ">" | ">=" ) primary )?
/// primary -> "(" expr ")" | FUNCTION "(" ( expr ( "," expr )* )? ")"
///          | STRING | NUMERIC | PROPERTY | ITEMLIST | ITEMMETADATA
///
/// Examples: "'$(Configuration)' == 'Debug'", "Exists('$(OutDir)') and !$(SkipBuild)",
/// "'@(Compile)' != '' or '$(Version)' >= '15.0'"
///
/// Every `expr` (top level, parenthesised group, function argument) and every
/// `!` is one nesting level. Nesting past the limit fails with
/// `ConditionNestedTooDeeply` before the call stack is at risk.

use serde::{Deserialize, Serialize};

use crate::context::SourceLocation;
use crate::error::{Diagnostic, ErrorCode};
use crate::expr::{BinaryOp, LogicalOp, Node, NodeKind};
use crate::scanner::{Scanner, Token};
use crate::token_type::TokenKind::{self, And, Comma, EndOfInput, Function, ItemList, ItemMetadata, LeftParen, Not, Numeric, Or, Property, RightParen};
use crate::value::{self, LiteralValue};

/// Default nesting limit. 52 levels of nesting must fail cleanly.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// What a condition may reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum ParserOptions {
    /// Properties, item lists and item metadata.
    #[default]
    AllowAll,
    /// Properties only; any item list or metadata reference is an error.
    AllowProperties,
}

pub struct Parser {
    scanner: Scanner,
    max_depth: usize,
    depth: usize,
}

impl Parser {

    pub fn new(expression: &str, options: ParserOptions) -> Self {
        Parser {
            scanner: Scanner::new(expression, options),
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses the whole input into a tree.
    pub fn parse(mut self) -> Result<Node, Diagnostic> {
        self.scanner.advance()?;
        let node = self.expr()?;
        if !self.check(EndOfInput) {
            return Err(self.unexpected());
        }
        Ok(node)
    }

    /// Matches production: expr -> and_expr ( "or" and_expr )*
    fn expr(&mut self) -> Result<Node, Diagnostic> {
        self.enter()?;
        let mut operands = vec![self.and_expr()?];
        while self.match_token(Or)?.is_some() {
            operands.push(self.and_expr()?);
        }
        self.leave();
        Ok(Node::logical(LogicalOp::Or, operands))
    }

    /// Matches production: and_expr -> not_expr ( "and" not_expr )*
    fn and_expr(&mut self) -> Result<Node, Diagnostic> {
        let mut operands = vec![self.not_expr()?];
        while self.match_token(And)?.is_some() {
            operands.push(self.not_expr()?);
        }
        Ok(Node::logical(LogicalOp::And, operands))
    }

    /// Matches production: not_expr -> "!" not_expr | equality
    fn not_expr(&mut self) -> Result<Node, Diagnostic> {
        if let Some(bang) = self.match_token(Not)? {
            self.enter()?;
            let operand = self.not_expr()?;
            self.leave();
            return Ok(Node::new(NodeKind::Not(Box::new(operand)), bang.start_offset));
        }
        self.equality()
    }

    /// Matches production: equality -> relational ( ( "==" | "!=" ) relational )?
    fn equality(&mut self) -> Result<Node, Diagnostic> {
        let left = self.relational()?;
        if !self.scanner.current().kind.is_equality() {
            return Ok(left);
        }
        let op = self.operator()?;
        let right = self.relational()?;
        Ok(Node::binary(op, left, right))
    }

    /// Matches production: relational -> primary ( ( "<" | "<=" | ">" | ">=" ) primary )?
    fn relational(&mut self) -> Result<Node, Diagnostic> {
        let left = self.primary()?;
        if !self.scanner.current().kind.is_relational() {
            return Ok(left);
        }
        let op = self.operator()?;
        let right = self.primary()?;
        Ok(Node::binary(op, left, right))
    }

    /// Matches production: primary -> "(" expr ")" | function call | operand
    fn primary(&mut self) -> Result<Node, Diagnostic> {
        let token = self.scanner.current().clone();
        match token.kind {
            LeftParen => {
                self.advance()?;
                let inner = self.expr()?;
                self.expect(RightParen)?;
                Ok(inner)
            }
            Function => {
                self.advance()?;
                self.function_call(token)
            }
            TokenKind::String => {
                self.advance()?;
                Ok(Self::string(token))
            }
            Numeric => {
                self.advance()?;
                let value = match value::parse_number(&token.text) {
                    Some(number) => LiteralValue::Number(number),
                    None => LiteralValue::Str(token.text.clone()),
                };
                Ok(Node::literal(value, token.text, token.start_offset))
            }
            Property => {
                self.advance()?;
                Ok(Node::new(NodeKind::PropertyRef(Self::body(&token)), token.start_offset))
            }
            ItemList => {
                self.advance()?;
                Ok(Node::new(NodeKind::ItemListRef(Self::body(&token)), token.start_offset))
            }
            ItemMetadata => {
                self.advance()?;
                Ok(Node::new(NodeKind::MetadataRef(Self::body(&token)), token.start_offset))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Matches the argument list of: FUNCTION "(" ( expr ( "," expr )* )? ")"
    /// The scanner only produces FUNCTION when a "(" follows.
    fn function_call(&mut self, name: Token) -> Result<Node, Diagnostic> {
        self.expect(LeftParen)?;
        let mut args = Vec::new();
        if self.match_token(RightParen)?.is_none() {
            loop {
                args.push(self.expr()?);
                if self.match_token(Comma)?.is_some() {
                    continue;
                }
                self.expect(RightParen)?;
                break;
            }
        }
        Ok(Node::new(NodeKind::FunctionCall { name: name.text, args }, name.start_offset))
    }

    /// Consumes the current comparison operator.
    fn operator(&mut self) -> Result<BinaryOp, Diagnostic> {
        let op = BinaryOp::from_token(self.scanner.current().kind).ok_or_else(|| self.unexpected())?;
        self.advance()?;
        Ok(op)
    }

    fn string(token: Token) -> Node {
        if token.expandable {
            return Node::new(NodeKind::ExpandableString(token.text), token.start_offset);
        }
        let value = match value::parse_bool(&token.text) {
            Some(b) if !token.quoted => LiteralValue::Bool(b),
            _ => LiteralValue::Str(token.text.clone()),
        };
        Node::literal(value, token.text, token.start_offset)
    }

    /// Text between the parentheses of `$(..)`, `@(..)` or `%(..)`.
    fn body(token: &Token) -> String {
        let inner = token.text.get(2..token.text.len() - 1).unwrap_or_default();
        inner.to_string()
    }

    fn enter(&mut self) -> Result<(), Diagnostic> {
        self.depth += 1;
        if self.depth > self.max_depth {
            let position = self.scanner.current().start_offset + 1;
            let message = format!(
                "{} at position {}: more than {} levels of nesting.",
                ErrorCode::ConditionNestedTooDeeply.summary(),
                position,
                self.max_depth
            );
            return Err(Diagnostic::new(ErrorCode::ConditionNestedTooDeeply, position, message));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Consumes the current token if it is of `kind`.
    fn match_token(&mut self, kind: TokenKind) -> Result<Option<Token>, Diagnostic> {
        if self.check(kind) {
            let token = self.scanner.current().clone();
            self.advance()?;
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Diagnostic> {
        match self.match_token(kind)? {
            Some(token) => Ok(token),
            None => Err(self.unexpected()),
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.scanner.is_next(kind)
    }

    fn advance(&mut self) -> Result<(), Diagnostic> {
        self.scanner.advance()?;
        Ok(())
    }

    /// The current token cannot continue the expression.
    fn unexpected(&self) -> Diagnostic {
        let token = self.scanner.current();
        Diagnostic::found(ErrorCode::UnexpectedTokenInCondition, token.start_offset + 1, token.display_text())
    }
}

/// Parses `expression` with the default nesting limit. Failures carry
/// `expression` and `location`.
#[tracing::instrument(level = "trace", skip(expression, location), fields(len = expression.len()))]
pub fn parse(expression: &str, options: ParserOptions, location: &SourceLocation) -> Result<Node, Diagnostic> {
    Parser::new(expression, options)
        .parse()
        .map_err(|e| e.with_source(expression, location))
}
