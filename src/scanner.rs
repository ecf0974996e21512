use std::fmt;

use crate::error::{Diagnostic, ErrorCode};
use crate::parser::ParserOptions;
use crate::token_type::TokenKind::{
    self, And, Comma, EndOfInput, EqualTo, Function, GreaterThan, GreaterThanOrEqualTo, ItemList, ItemMetadata, LeftParen,
    LessThan, LessThanOrEqualTo, Not, NotEqualTo, Numeric, Or, Property, RightParen,
};

/// The `Scanner` hands out one token at a time on demand. It keeps no state
/// besides the input and its own position, and reports errors with the
/// 1-based character position a reader would point at.
pub struct Scanner {
    chars: Vec<char>, // input, indexed by character
    options: ParserOptions,
    parse_point: usize, // index of the next unread char
    lookahead: Token, // last token produced by advance()
}

impl Scanner {

    pub fn new(source: &str, options: ParserOptions) -> Self {
        Scanner {
            chars: source.chars().collect(),
            options,
            parse_point: 0,
            lookahead: Token::new(EndOfInput, "", 0),
        }
    }

    /// The token produced by the last call to `advance`.
    pub fn current(&self) -> &Token {
        &self.lookahead
    }

    pub fn is_next(&self, kind: TokenKind) -> bool {
        self.lookahead.kind == kind
    }

    /// Reads the next token. Returns `Ok(false)` once the input is exhausted,
    /// in which case `current()` is `EndOfInput` positioned one past the end.
    pub fn advance(&mut self) -> Result<bool, Diagnostic> {
        self.skip_whitespace();

        let start = self.parse_point;
        let c = match self.peek() {
            Some(c) => c,
            None => {
                self.lookahead = Token::new(EndOfInput, "", self.chars.len());
                return Ok(false);
            }
        };

        let token = match c {
            ',' => self.single(Comma),
            '(' => self.single(LeftParen),
            ')' => self.single(RightParen),
            '$' => self.property()?,
            '@' => self.item_list()?,
            '%' => self.item_metadata()?,
            '\'' => self.quoted_string()?,
            '!' => self.match_and_make('=', NotEqualTo, Not),
            '<' => self.match_and_make('=', LessThanOrEqualTo, LessThan),
            '>' => self.match_and_make('=', GreaterThanOrEqualTo, GreaterThan),
            '=' => {
                if self.peek_at(start + 1) == Some('=') {
                    self.parse_point += 2;
                    Token::new(EqualTo, "==", start)
                } else {
                    // reported at the char that should have been the second '='
                    let found = self.describe_at(start + 1);
                    return Err(Diagnostic::found(ErrorCode::IllFormedEqualsInCondition, start + 2, found));
                }
            }
            _ if Self::is_number_start(c) => self.numeric()?,
            _ if Self::is_simple_string_start(c) => self.simple_string_or_function(),
            _ => return Err(Diagnostic::found(ErrorCode::UnexpectedCharacterInCondition, start + 1, c.to_string())),
        };

        self.lookahead = token;
        Ok(true)
    }

    /// Scans `source` completely. The last token is always `EndOfInput`.
    pub fn tokenize(source: &str, options: ParserOptions) -> Result<Vec<Token>, Diagnostic> {
        let mut scanner = Scanner::new(source, options);
        let mut tokens = Vec::<Token>::new();
        while scanner.advance()? {
            tokens.push(scanner.current().clone());
        }
        tokens.push(scanner.current().clone());
        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.parse_point;
        self.parse_point += 1;
        Token::new(kind, self.substring(start, self.parse_point), start)
    }

    fn match_and_make(&mut self, expected: char, matched: TokenKind, unmatched: TokenKind) -> Token {
        let start = self.parse_point;
        let len = if self.peek_at(start + 1) == Some(expected) { 2 } else { 1 };
        self.parse_point += len;
        let kind = if len == 2 { matched } else { unmatched };
        Token::new(kind, self.substring(start, self.parse_point), start)
    }

    /// `$(...)`. Nested `$(` in the body is followed, and whitespace is only
    /// legal at a nesting level that also contains non-identifier characters,
    /// as in `$(x.Replace(' ', ''))`.
    fn property(&mut self) -> Result<Token, Diagnostic> {
        let start = self.parse_point;
        if self.peek_at(start + 1) != Some('(') {
            let found = self.describe_at(start + 1);
            return Err(Diagnostic::found(ErrorCode::IllFormedPropertyOpenParenthesisInCondition, start + 1, found));
        }

        let close = match self.scan_property_end(start + 1) {
            Ok(close) => close,
            Err(space) => {
                return Err(Diagnostic::found(ErrorCode::IllFormedPropertySpaceInCondition, space + 1, self.chars[space].to_string()))
            }
        };
        if close >= self.chars.len() {
            return Err(Diagnostic::found(ErrorCode::IllFormedPropertyCloseParenthesisInCondition, start + 1, END_OF_INPUT));
        }

        self.parse_point = close + 1;
        Ok(Token::new(Property, self.substring(start, self.parse_point), start))
    }

    /// Starting at the `(` of a property, returns the index of the matching
    /// `)` (or the input length when there is none), or `Err` with the index of
    /// whitespace that makes the body ill-formed. Nesting is tracked on an
    /// explicit stack.
    fn scan_property_end(&self, open: usize) -> Result<usize, usize> {
        #[derive(Default)]
        struct Level {
            depth: usize,
            whitespace: Option<usize>,
            non_identifier: bool,
        }

        let mut levels = vec![Level::default()];
        let mut i = open;
        while i < self.chars.len() {
            let c = self.chars[i];
            let Some(level) = levels.last_mut() else { break };
            match c {
                '(' => level.depth += 1,
                ')' => level.depth = level.depth.saturating_sub(1),
                _ if c.is_whitespace() => level.whitespace = Some(i),
                _ if !Self::is_identifier_char(c) => level.non_identifier = true,
                _ => {}
            }

            if c == '$' && self.peek_at(i + 1) == Some('(') {
                levels.push(Level::default());
                i += 1;
                continue;
            }

            if level.depth == 0 {
                if let (Some(space), false) = (level.whitespace, level.non_identifier) {
                    return Err(space);
                }
                levels.pop();
                if levels.is_empty() {
                    return Ok(i);
                }
            }
            i += 1;
        }
        Ok(self.chars.len())
    }

    /// `@(Type)`, `@(Type, 'sep')`, `@(Type->'transform')`. Quoted text inside
    /// may contain parentheses.
    fn item_list(&mut self) -> Result<Token, Diagnostic> {
        let start = self.parse_point;
        if self.options == ParserOptions::AllowProperties {
            return Err(Diagnostic::at(ErrorCode::ItemListNotAllowedInThisConditional, start + 1));
        }
        if self.peek_at(start + 1) != Some('(') {
            let found = self.describe_at(start + 1);
            return Err(Diagnostic::found(ErrorCode::IllFormedItemListOpenParenthesisInCondition, start + 1, found));
        }

        let mut i = start + 2;
        let mut in_quote = false;
        let mut open_parens = 0;
        while i < self.chars.len() {
            match self.chars[i] {
                '\'' => in_quote = !in_quote,
                '(' if !in_quote => open_parens += 1,
                ')' if !in_quote => {
                    if open_parens == 0 {
                        break;
                    }
                    open_parens -= 1;
                }
                _ => {}
            }
            i += 1;
        }

        if i >= self.chars.len() {
            return Err(if in_quote {
                Diagnostic::found(ErrorCode::IllFormedItemListQuoteInCondition, start + 1, END_OF_INPUT)
            } else {
                Diagnostic::found(ErrorCode::IllFormedItemListCloseParenthesisInCondition, start + 1, END_OF_INPUT)
            });
        }

        self.parse_point = i + 1;
        Ok(Token::new(ItemList, self.substring(start, self.parse_point), start))
    }

    /// `%(Name)` or `%(Item.Name)` outside of quotes.
    fn item_metadata(&mut self) -> Result<Token, Diagnostic> {
        let start = self.parse_point;
        if self.peek_at(start + 1) != Some('(') {
            return Err(Diagnostic::found(ErrorCode::UnexpectedCharacterInCondition, start + 1, "%"));
        }
        if self.options == ParserOptions::AllowProperties {
            return Err(Diagnostic::at(ErrorCode::ItemMetadataNotAllowedInThisConditional, start + 1));
        }

        let close = match (start + 2..self.chars.len()).find(|&i| self.chars[i] == ')') {
            Some(close) => close,
            None => {
                return Err(Diagnostic::found(ErrorCode::IllFormedItemMetadataCloseParenthesisInCondition, start + 1, END_OF_INPUT))
            }
        };

        self.parse_point = close + 1;
        Ok(Token::new(ItemMetadata, self.substring(start, self.parse_point), start))
    }

    /// `'...'`. The token text excludes the quotes. Strings holding
    /// references or `%` escapes are marked expandable.
    fn quoted_string(&mut self) -> Result<Token, Diagnostic> {
        let quote = self.parse_point;
        let start = quote + 1;
        let mut expandable = false;
        let mut i = start;

        while i < self.chars.len() && self.chars[i] != '\'' {
            let opens_paren = self.peek_at(i + 1) == Some('(');
            match self.chars[i] {
                '@' if opens_paren => {
                    if self.options == ParserOptions::AllowProperties {
                        return Err(Diagnostic::at(ErrorCode::ItemListNotAllowedInThisConditional, i + 1));
                    }
                    expandable = true;
                    i = self.skip_embedded_item_list(i);
                    continue;
                }
                '%' if opens_paren => {
                    if self.options == ParserOptions::AllowProperties {
                        return Err(Diagnostic::at(ErrorCode::ItemMetadataNotAllowedInThisConditional, i + 1));
                    }
                    expandable = true;
                }
                '$' if opens_paren => expandable = true,
                '%' => expandable = true,
                _ => {}
            }
            i += 1;
        }

        if i >= self.chars.len() {
            return Err(Diagnostic::at(ErrorCode::IllFormedQuotedStringInCondition, quote + 1));
        }

        self.parse_point = i + 1;
        let token = Token::new(TokenKind::String, self.substring(start, i), quote);
        Ok(Token { quoted: true, expandable, ..token })
    }

    /// From the `@` of an item list inside a quoted string, returns the index
    /// just past its closing `)`, stepping over quoted transforms.
    fn skip_embedded_item_list(&self, at: usize) -> usize {
        let mut i = at + 2;
        while i < self.chars.len() && self.chars[i] != ')' {
            if self.chars[i] == '\'' {
                i += 1;
                while i < self.chars.len() && self.chars[i] != '\'' {
                    i += 1;
                }
            }
            i += 1;
        }
        (i + 1).min(self.chars.len())
    }

    /// Decimal (`-1`, `1234.`, `.5`, `1.2.3`) or hex (`0x1F`). The raw text is
    /// kept; conversion happens during evaluation.
    fn numeric(&mut self) -> Result<Token, Diagnostic> {
        let start = self.parse_point;
        let is_hex = self.peek() == Some('0')
            && matches!(self.peek_at(start + 1), Some('x') | Some('X'))
            && self.peek_at(start + 2).is_some();

        if is_hex {
            self.parse_point += 2;
            let digits = self.skip_while(|c| c.is_ascii_hexdigit());
            if digits == 0 {
                let found = self.describe_at(self.parse_point);
                return Err(Diagnostic::found(ErrorCode::UnexpectedCharacterInCondition, self.parse_point + 1, found));
            }
        } else {
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.parse_point += 1;
            }
            let mut digits = self.skip_while(|c| c.is_ascii_digit());
            if self.peek() == Some('.') {
                self.parse_point += 1;
                digits += self.skip_while(|c| c.is_ascii_digit());
            }
            if digits == 0 {
                return Err(Diagnostic::found(ErrorCode::UnexpectedCharacterInCondition, start + 1, self.chars[start].to_string()));
            }
            // further components of a dotted version
            while self.peek() == Some('.') && self.peek_at(self.parse_point + 1).is_some_and(|c| c.is_ascii_digit()) {
                self.parse_point += 1;
                self.skip_while(|c| c.is_ascii_digit());
            }
        }

        if let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                return Err(Diagnostic::found(ErrorCode::UnexpectedCharacterInCondition, self.parse_point + 1, c.to_string()));
            }
        }

        Ok(Token::new(Numeric, self.substring(start, self.parse_point), start))
    }

    /// Bare words: `and`/`or` keywords, function names (followed by `(`), or
    /// unquoted strings such as `true` or `Debug`.
    fn simple_string_or_function(&mut self) -> Token {
        let start = self.parse_point;
        self.skip_while(Self::is_simple_string_char);
        let word = self.substring(start, self.parse_point);

        if word.eq_ignore_ascii_case("and") {
            return Token::new(And, "and", start);
        }
        if word.eq_ignore_ascii_case("or") {
            return Token::new(Or, "or", start);
        }

        let end = self.parse_point;
        self.skip_whitespace();
        if self.peek() == Some('(') {
            Token::new(Function, word, start)
        } else {
            self.parse_point = end;
            Token::new(TokenKind::String, word, start)
        }
    }

    fn skip_whitespace(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    /// Advances over chars matching `predicate`, returning how many were skipped.
    fn skip_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        let begin = self.parse_point;
        while matches!(self.peek(), Some(c) if predicate(c)) {
            self.parse_point += 1;
        }
        self.parse_point - begin
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(self.parse_point)
    }

    fn peek_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    /// The char at `index` for use in a message, or `EndOfInput`.
    fn describe_at(&self, index: usize) -> String {
        self.peek_at(index).map_or_else(|| END_OF_INPUT.to_string(), |c| c.to_string())
    }

    fn substring(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn is_number_start(c: char) -> bool {
        c.is_ascii_digit() || c == '+' || c == '-' || c == '.'
    }

    fn is_simple_string_start(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }

    fn is_simple_string_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
    }
}

pub const END_OF_INPUT: &str = "EndOfInput";

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start_offset: usize, // 0-based char index of the first char
    pub quoted: bool,
    pub expandable: bool, // quoted strings only: holds references or escapes
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start_offset: usize) -> Self {
        Token { kind, text: text.into(), start_offset, quoted: false, expandable: false }
    }

    /// Text shown when this token turns up where it should not.
    pub fn display_text(&self) -> String {
        match self.kind {
            EndOfInput => END_OF_INPUT.to_string(),
            _ if self.quoted => format!("'{}'", self.text),
            _ => self.text.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} {} @{}", self.kind, self.display_text(), self.start_offset)
    }
}
