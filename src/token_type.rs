#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter)]
pub enum TokenKind {
    Numeric, String, Property, ItemList, ItemMetadata, Function, // operands
    And, Or, Not,
    EqualTo, NotEqualTo,
    LessThan, GreaterThan, LessThanOrEqualTo, GreaterThanOrEqualTo,
    LeftParen, RightParen, Comma,
    EndOfInput,
}

impl TokenKind {
    pub fn is_relational(self) -> bool {
        matches!(self, TokenKind::LessThan | TokenKind::GreaterThan | TokenKind::LessThanOrEqualTo | TokenKind::GreaterThanOrEqualTo)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, TokenKind::EqualTo | TokenKind::NotEqualTo)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_operator_classes() {
        let relational: Vec<_> = TokenKind::iter().filter(|k| k.is_relational()).collect();
        assert_eq!(relational, vec![TokenKind::LessThan, TokenKind::GreaterThan, TokenKind::LessThanOrEqualTo, TokenKind::GreaterThanOrEqualTo]);
        let equality: Vec<_> = TokenKind::iter().filter(|k| k.is_equality()).collect();
        assert_eq!(equality, vec![TokenKind::EqualTo, TokenKind::NotEqualTo]);
    }

    #[test]
    fn test_names() {
        assert_eq!(TokenKind::EndOfInput.to_string(), "EndOfInput");
        assert_eq!(TokenKind::ItemMetadata.to_string(), "ItemMetadata");
    }
}
