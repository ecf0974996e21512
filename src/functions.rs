use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::error::{Diagnostic, ErrorCode};
use crate::value::{LiteralValue, Version};

pub type ConditionFunction = Box<dyn Fn(&[LiteralValue]) -> Result<LiteralValue, Diagnostic> + Send + Sync>;

struct Entry {
    arity: usize,
    function: ConditionFunction,
}

/// Functions callable from a condition, looked up by exact (case-sensitive)
/// name. Every function takes a fixed number of arguments.
///
/// Errors returned from `call` are unplaced; the evaluator attaches the
/// position of the call.
pub struct FunctionRegistry {
    functions: HashMap<String, Entry>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_set().entries(self.names()).finish()
    }
}

impl FunctionRegistry {

    pub fn empty() -> Self {
        FunctionRegistry { functions: HashMap::new() }
    }

    /// `HasTrailingSlash` and the `Version*` comparison functions.
    pub fn builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("HasTrailingSlash", 1, |args| {
            let text = args[0].as_text();
            Ok(LiteralValue::Bool(text.ends_with('/') || text.ends_with('\\')))
        });

        let comparisons: [(&str, fn(Ordering) -> bool); 6] = [
            ("VersionEquals", Ordering::is_eq),
            ("VersionNotEquals", Ordering::is_ne),
            ("VersionLessThan", Ordering::is_lt),
            ("VersionLessThanOrEquals", Ordering::is_le),
            ("VersionGreaterThan", Ordering::is_gt),
            ("VersionGreaterThanOrEquals", Ordering::is_ge),
        ];
        for (name, accepts) in comparisons {
            registry.register(name, 2, move |args| {
                let left = version_argument(name, &args[0])?;
                let right = version_argument(name, &args[1])?;
                Ok(LiteralValue::Bool(accepts(left.cmp(&right))))
            });
        }
        registry
    }

    /// Adds `AreFeaturesEnabled(wave)`, true for every wave up to and
    /// including `wave`.
    pub fn with_feature_wave(mut self, wave: Version) -> Self {
        self.register("AreFeaturesEnabled", 1, move |args| {
            let requested = version_argument("AreFeaturesEnabled", &args[0])?;
            Ok(LiteralValue::Bool(requested <= wave))
        });
        self
    }

    /// Registers `function` under `name`, replacing any function of that name.
    pub fn register<F>(&mut self, name: &str, arity: usize, function: F) -> &mut Self
    where
        F: Fn(&[LiteralValue]) -> Result<LiteralValue, Diagnostic> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Entry { arity, function: Box::new(function) });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn call(&self, name: &str, args: &[LiteralValue]) -> Result<LiteralValue, Diagnostic> {
        let entry = self
            .functions
            .get(name)
            .ok_or_else(|| Diagnostic::unplaced(ErrorCode::UndefinedFunctionCall, format!("\"{}\"", name)))?;

        if args.len() != entry.arity {
            let detail = format!("\"{}\" takes {} argument(s) but {} were given", name, entry.arity, args.len());
            return Err(Diagnostic::unplaced(ErrorCode::IncorrectNumberOfFunctionArguments, detail));
        }
        (entry.function)(args)
    }
}

fn version_argument(function: &str, arg: &LiteralValue) -> Result<Version, Diagnostic> {
    arg.as_version().ok_or_else(|| {
        let detail = format!("\"{}\" expects a version, got \"{}\"", function, arg);
        Diagnostic::unplaced(ErrorCode::InvalidFunctionArgumentInCondition, detail)
    })
}
