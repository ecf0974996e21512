use ariadne::{Config, Label, Report, ReportKind, Source};
use std::fmt;
use std::io;

use crate::context::SourceLocation;

/// The closed catalog of failure classes. Callers match on these, never on
/// message text. The variant name is the externally visible code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    strum_macros::Display, strum_macros::EnumString, strum_macros::IntoStaticStr, strum_macros::EnumIter,
)]
pub enum ErrorCode {
    IllFormedEqualsInCondition,
    IllFormedPropertyOpenParenthesisInCondition,
    IllFormedPropertyCloseParenthesisInCondition,
    IllFormedPropertySpaceInCondition,
    IllFormedItemListOpenParenthesisInCondition,
    IllFormedItemListCloseParenthesisInCondition,
    IllFormedItemListQuoteInCondition,
    IllFormedItemMetadataCloseParenthesisInCondition,
    IllFormedQuotedStringInCondition,
    ItemListNotAllowedInThisConditional,
    ItemMetadataNotAllowedInThisConditional,
    UnexpectedCharacterInCondition,
    UnexpectedTokenInCondition,
    ConditionNestedTooDeeply,
    UndefinedFunctionCall,
    IncorrectNumberOfFunctionArguments,
    InvalidFunctionArgumentInCondition,
    ComparisonOnNonNumericExpression,
    ExpectedBooleanInCondition,
}

/// Where in the pipeline a failure class originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Stage {
    Lexical,
    Syntactic,
    Evaluation,
    Resource,
}

impl ErrorCode {
    pub fn summary(self) -> &'static str {
        use ErrorCode::*;
        match self {
            IllFormedEqualsInCondition => "Expected \"==\" instead of a single \"=\"",
            IllFormedPropertyOpenParenthesisInCondition => "Expected \"(\" after \"$\" to open a property reference",
            IllFormedPropertyCloseParenthesisInCondition => "Expected \")\" to close the property reference",
            IllFormedPropertySpaceInCondition => "Unexpected whitespace inside the property reference",
            IllFormedItemListOpenParenthesisInCondition => "Expected \"(\" after \"@\" to open an item list reference",
            IllFormedItemListCloseParenthesisInCondition => "Expected \")\" to close the item list reference",
            IllFormedItemListQuoteInCondition => "Expected \"'\" to close the quoted text inside the item list reference",
            IllFormedItemMetadataCloseParenthesisInCondition => "Expected \")\" to close the item metadata reference",
            IllFormedQuotedStringInCondition => "Expected \"'\" to close the quoted string",
            ItemListNotAllowedInThisConditional => "Item lists are not allowed in this condition",
            ItemMetadataNotAllowedInThisConditional => "Item metadata references are not allowed in this condition",
            UnexpectedCharacterInCondition => "Unexpected character",
            UnexpectedTokenInCondition => "Unexpected token",
            ConditionNestedTooDeeply => "Condition is nested too deeply",
            UndefinedFunctionCall => "Unknown function",
            IncorrectNumberOfFunctionArguments => "Incorrect number of arguments to function",
            InvalidFunctionArgumentInCondition => "Invalid argument to function",
            ComparisonOnNonNumericExpression => "A numeric comparison was attempted on a value that is neither a number nor a version",
            ExpectedBooleanInCondition => "Expected a boolean value",
        }
    }

    pub fn stage(self) -> Stage {
        use ErrorCode::*;
        match self {
            UnexpectedTokenInCondition | ItemListNotAllowedInThisConditional | ItemMetadataNotAllowedInThisConditional => Stage::Syntactic,
            ConditionNestedTooDeeply => Stage::Resource,
            UndefinedFunctionCall | IncorrectNumberOfFunctionArguments | InvalidFunctionArgumentInCondition
            | ComparisonOnNonNumericExpression | ExpectedBooleanInCondition => Stage::Evaluation,
            _ => Stage::Lexical,
        }
    }
}

/// A failure anywhere in scanning, parsing or evaluating a condition.
///
/// `offset` is the 1-based character position of the failure in `condition`.
/// An offset of 0 means the failure has not been placed yet (function errors
/// raised by a registry, before the evaluator attaches the call site).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub offset: usize,
    pub unexpected_token: Option<String>,
    pub condition: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        if self.location.is_known() {
            write!(f, "{}: ", self.location)?;
        }
        write!(f, "error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Diagnostic { }

impl Diagnostic {

    pub fn new(code: ErrorCode, offset: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            offset,
            unexpected_token: None,
            condition: String::new(),
            location: SourceLocation::default(),
        }
    }

    /// Failure at a position, with the standard summary as message.
    pub(crate) fn at(code: ErrorCode, offset: usize) -> Self {
        Self::new(code, offset, format!("{} at position {}.", code.summary(), offset))
    }

    /// Failure at a position where `found` was encountered instead of something valid.
    pub(crate) fn found(code: ErrorCode, offset: usize, found: impl Into<String>) -> Self {
        let found = found.into();
        let message = format!("{} at position {}, found \"{}\".", code.summary(), offset, found);
        Diagnostic { unexpected_token: Some(found), ..Self::new(code, offset, message) }
    }

    /// Failure without a known position yet.
    pub fn unplaced(code: ErrorCode, detail: impl fmt::Display) -> Self {
        Self::new(code, 0, format!("{}: {}.", code.summary(), detail))
    }

    /// Attaches a position to a diagnostic that does not carry one.
    pub(crate) fn placed_at(mut self, offset: usize) -> Self {
        if self.offset == 0 {
            self.offset = offset;
        }
        self
    }

    /// Attaches the failing condition text and where it came from.
    pub fn with_source(mut self, condition: &str, location: &SourceLocation) -> Self {
        self.condition = condition.to_string();
        self.location = location.clone();
        self
    }

    pub fn stage(&self) -> Stage {
        self.code.stage()
    }

    /// Renders a caret report pointing into the condition, without colors.
    pub fn render(&self) -> String {
        let mut buffer = Vec::<u8>::new();
        if self.write_report(&mut buffer, false).is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Prints the caret report to stderr.
    pub fn print(&self) -> io::Result<()> {
        self.write_report(io::stderr(), true)
    }

    fn write_report<W: io::Write>(&self, writer: W, color: bool) -> io::Result<()> {
        let source_name = if self.location.is_known() { self.location.to_string() } else { "condition".to_string() };
        let source_name = source_name.as_str();

        // 1-based positions to 0-based char spans; end of input points one past the last char
        let position = self.offset.saturating_sub(1).min(self.condition.chars().count());
        let label = Label::new((source_name, position..position)).with_message(self.message.clone());

        Report::build(ReportKind::Error, (source_name, position..position))
            .with_config(Config::default().with_color(color))
            .with_code(self.code)
            .with_message(self.code.summary())
            .with_label(label)
            .finish()
            .write((source_name, Source::from(self.condition.as_str())), writer)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_codes_round_trip_through_their_names() {
        for code in ErrorCode::iter() {
            let name: &'static str = code.into();
            assert_eq!(ErrorCode::from_str(name).unwrap(), code);
            assert_eq!(code.to_string(), name);
        }
    }

    #[test]
    fn test_summaries_are_distinct() {
        let summaries: HashSet<_> = ErrorCode::iter().map(ErrorCode::summary).collect();
        assert_eq!(summaries.len(), ErrorCode::iter().count());
    }

    #[test]
    fn test_stages() {
        assert_eq!(ErrorCode::IllFormedQuotedStringInCondition.stage(), Stage::Lexical);
        assert_eq!(ErrorCode::UnexpectedTokenInCondition.stage(), Stage::Syntactic);
        assert_eq!(ErrorCode::ConditionNestedTooDeeply.stage(), Stage::Resource);
        assert_eq!(ErrorCode::UndefinedFunctionCall.stage(), Stage::Evaluation);
    }

    #[test]
    fn test_found_records_unexpected_text() {
        let error = Diagnostic::found(ErrorCode::IllFormedEqualsInCondition, 6, "5");
        assert_eq!(error.unexpected_token.as_deref(), Some("5"));
        assert!(error.message.contains("position 6"));
        assert!(error.to_string().starts_with("error IllFormedEqualsInCondition"));
    }

    #[test]
    fn test_placed_at_keeps_existing_offset() {
        let placed = Diagnostic::at(ErrorCode::UnexpectedTokenInCondition, 3).placed_at(9);
        assert_eq!(placed.offset, 3);
        let unplaced = Diagnostic::unplaced(ErrorCode::UndefinedFunctionCall, "Foo").placed_at(9);
        assert_eq!(unplaced.offset, 9);
    }

    #[test]
    fn test_display_includes_known_location() {
        let location = SourceLocation::new("app.proj", 12, 5);
        let error = Diagnostic::at(ErrorCode::UnexpectedTokenInCondition, 2).with_source(" ", &location);
        assert!(error.to_string().starts_with("app.proj(12,5): error UnexpectedTokenInCondition"));
    }

    #[test]
    fn test_render_mentions_code_and_message() {
        let error = Diagnostic::found(ErrorCode::IllFormedEqualsInCondition, 6, "5")
            .with_source("1234=5678", &SourceLocation::default());
        let report = error.render();
        assert!(report.contains("IllFormedEqualsInCondition"));
        assert!(report.contains("position 6"));
    }
}
