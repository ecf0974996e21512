use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Diagnostic;
use crate::functions::FunctionRegistry;
use crate::value::LiteralValue;

/// Where a condition was written, used to prefix diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        SourceLocation { file: file.into(), line, column }
    }

    pub fn is_known(&self) -> bool {
        !self.file.is_empty()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match (self.line, self.column) {
            (0, _) => write!(f, "{}", self.file),
            (line, 0) => write!(f, "{}({})", self.file, line),
            (line, column) => write!(f, "{}({},{})", self.file, line, column),
        }
    }
}

/// The lookups and function dispatch the evaluator needs from the build
/// state. The evaluator only reads through this interface.
pub trait EvaluationContext {
    /// Raw (still escaped) value of a property, `None` when unset.
    fn lookup_property(&self, name: &str) -> Option<String>;

    /// Expanded text of an item list. `transform_or_separator` is whatever
    /// followed the item type inside `@( )`, e.g. `->'%(Filename)'` or `, ';'`.
    fn lookup_item_list(&self, name: &str, transform_or_separator: &str) -> String;

    /// Value of a metadata; `item_name` is empty for unqualified `%(Name)`.
    fn lookup_metadata(&self, item_name: &str, metadata_name: &str) -> Option<String>;

    fn call_function(&self, name: &str, args: &[LiteralValue]) -> Result<LiteralValue, Diagnostic>;
}

/// An in-memory context. Property, item and metadata names are matched
/// case-insensitively.
#[derive(Default)]
pub struct PropertyBag {
    properties: HashMap<String, String>,
    items: HashMap<String, Vec<String>>,
    metadata: HashMap<String, String>,
    functions: FunctionRegistry,
}

impl PropertyBag {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        PropertyBag { functions, ..Self::default() }
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.properties.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn add_item(&mut self, item_type: &str, include: impl Into<String>) -> &mut Self {
        self.items.entry(item_type.to_lowercase()).or_default().push(include.into());
        self
    }

    /// `item_name` may be empty for metadata of the item currently being batched.
    pub fn set_metadata(&mut self, item_name: &str, metadata_name: &str, value: impl Into<String>) -> &mut Self {
        self.metadata.insert(Self::metadata_key(item_name, metadata_name), value.into());
        self
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    fn metadata_key(item_name: &str, metadata_name: &str) -> String {
        if item_name.is_empty() {
            metadata_name.to_lowercase()
        } else {
            format!("{}.{}", item_name.to_lowercase(), metadata_name.to_lowercase())
        }
    }

    /// Applies `->'template'` and `, 'separator'` to the includes of one item type.
    /// Only `%(Identity)` is substituted in a transform template.
    fn expand_items(includes: &[String], transform_or_separator: &str) -> String {
        let mut rest = transform_or_separator.trim();
        let mut entries: Vec<String> = includes.to_vec();

        if let Some(after_arrow) = rest.strip_prefix("->") {
            let (template, remainder) = split_quoted(after_arrow.trim_start());
            entries = entries
                .iter()
                .map(|include| replace_ignore_case(template, "%(Identity)", include))
                .collect();
            rest = remainder.trim();
        }

        let separator = match rest.strip_prefix(',') {
            Some(after_comma) => split_quoted(after_comma.trim_start()).0,
            None => ";",
        };
        entries.join(separator)
    }
}

impl EvaluationContext for PropertyBag {
    fn lookup_property(&self, name: &str) -> Option<String> {
        self.properties.get(&name.trim().to_lowercase()).cloned()
    }

    fn lookup_item_list(&self, name: &str, transform_or_separator: &str) -> String {
        match self.items.get(&name.to_lowercase()) {
            Some(includes) => Self::expand_items(includes, transform_or_separator),
            None => String::new(),
        }
    }

    fn lookup_metadata(&self, item_name: &str, metadata_name: &str) -> Option<String> {
        self.metadata
            .get(&Self::metadata_key(item_name, metadata_name))
            .or_else(|| self.metadata.get(&Self::metadata_key("", metadata_name)))
            .cloned()
    }

    fn call_function(&self, name: &str, args: &[LiteralValue]) -> Result<LiteralValue, Diagnostic> {
        self.functions.call(name, args)
    }
}

/// Splits `'quoted' rest` into the quoted content and what follows it.
/// Unquoted input is returned whole as content.
fn split_quoted(text: &str) -> (&str, &str) {
    match text.strip_prefix('\'') {
        Some(inner) => match inner.find('\'') {
            Some(end) => (&inner[..end], &inner[end + 1..]),
            None => (inner, ""),
        },
        None => (text, ""),
    }
}

fn replace_ignore_case(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut result = String::with_capacity(haystack.len());
    let mut last = 0;
    for (index, _) in lower.match_indices(&needle) {
        result.push_str(&haystack[last..index]);
        result.push_str(replacement);
        last = index + needle.len();
    }
    result.push_str(&haystack[last..]);
    result
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bag() -> PropertyBag {
        let mut bag = PropertyBag::new();
        bag.set_property("Configuration", "Debug")
            .add_item("Compile", "a.cs")
            .add_item("Compile", "b.cs")
            .set_metadata("Compile", "Culture", "fr")
            .set_metadata("", "Link", "shared");
        bag
    }

    #[test]
    fn test_properties_are_case_insensitive() {
        let bag = bag();
        assert_eq!(bag.lookup_property("configuration").as_deref(), Some("Debug"));
        assert_eq!(bag.lookup_property("CONFIGURATION").as_deref(), Some("Debug"));
        assert_eq!(bag.lookup_property("Platform"), None);
    }

    #[test]
    fn test_item_list_default_separator() {
        assert_eq!(bag().lookup_item_list("Compile", ""), "a.cs;b.cs");
    }

    #[test]
    fn test_item_list_custom_separator() {
        assert_eq!(bag().lookup_item_list("compile", ", ' | '"), "a.cs | b.cs");
    }

    #[test]
    fn test_item_list_transform_and_separator() {
        assert_eq!(bag().lookup_item_list("Compile", "->'obj/%(Identity)', ','"), "obj/a.cs,obj/b.cs");
    }

    #[test]
    fn test_unknown_item_list_is_empty() {
        assert_eq!(bag().lookup_item_list("Content", ""), "");
    }

    #[test]
    fn test_metadata_lookup_falls_back_to_unqualified() {
        let bag = bag();
        assert_eq!(bag.lookup_metadata("Compile", "Culture").as_deref(), Some("fr"));
        assert_eq!(bag.lookup_metadata("", "culture"), None);
        assert_eq!(bag.lookup_metadata("Compile", "Link").as_deref(), Some("shared"));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(SourceLocation::new("a.proj", 3, 7).to_string(), "a.proj(3,7)");
        assert_eq!(SourceLocation::new("a.proj", 3, 0).to_string(), "a.proj(3)");
        assert!(!SourceLocation::default().is_known());
    }
}
