//! Lexer, parser and evaluator for the condition expressions of build files,
//! such as `'$(Configuration)|$(Platform)' == 'Debug|AnyCPU'`.
//!
//! ```
//! use condition_parser::{evaluate, ParserOptions, PropertyBag, SourceLocation};
//!
//! let mut properties = PropertyBag::new();
//! properties.set_property("Configuration", "Debug");
//!
//! let result = evaluate("'$(Configuration)' == 'Debug'", ParserOptions::AllowAll, &SourceLocation::default(), &properties);
//! assert_eq!(result, Ok(true));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod escaping;
pub mod evaluator;
pub mod expander;
pub mod expr;
pub mod functions;
pub mod parser;
pub mod scanner;
pub mod token_type;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use context::{EvaluationContext, PropertyBag, SourceLocation};
pub use error::{Diagnostic, ErrorCode, Stage};
pub use evaluator::Evaluator;
pub use expr::{BinaryOp, LogicalOp, Node, NodeKind};
pub use functions::FunctionRegistry;
pub use parser::{parse, Parser, ParserOptions, DEFAULT_MAX_DEPTH};
pub use value::{LiteralValue, Version};

/// Parses and evaluates `condition`. An empty condition is true. Failures
/// carry `condition` and `location`.
pub fn evaluate(
    condition: &str,
    options: ParserOptions,
    location: &SourceLocation,
    context: &dyn EvaluationContext,
) -> Result<bool, Diagnostic> {
    evaluate_with_depth(condition, options, DEFAULT_MAX_DEPTH, location, context)
}

#[tracing::instrument(level = "trace", skip(location, context))]
fn evaluate_with_depth(
    condition: &str,
    options: ParserOptions,
    max_depth: usize,
    location: &SourceLocation,
    context: &dyn EvaluationContext,
) -> Result<bool, Diagnostic> {
    if condition.is_empty() {
        return Ok(true);
    }

    let result = Parser::new(condition, options)
        .with_max_depth(max_depth)
        .parse()
        .and_then(|tree| Evaluator::new(context).evaluate(&tree));

    match result {
        Ok(value) => {
            tracing::debug!(value, "condition evaluated");
            Ok(value)
        }
        Err(e) => Err(e.with_source(condition, location)),
    }
}

/// Conditions parsed and evaluated under one [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConditionEngine {
    config: EngineConfig,
}

impl ConditionEngine {

    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ConditionEngine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Functions available to conditions under this configuration.
    pub fn functions(&self) -> Result<FunctionRegistry, ConfigError> {
        self.config.functions()
    }

    pub fn parse(&self, condition: &str, location: &SourceLocation) -> Result<Node, Diagnostic> {
        Parser::new(condition, self.config.options)
            .with_max_depth(self.config.max_depth)
            .parse()
            .map_err(|e| e.with_source(condition, location))
    }

    pub fn evaluate(
        &self,
        condition: &str,
        location: &SourceLocation,
        context: &dyn EvaluationContext,
    ) -> Result<bool, Diagnostic> {
        evaluate_with_depth(condition, self.config.options, self.config.max_depth, location, context)
    }
}
