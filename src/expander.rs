//! Expansion of `$(..)`, `@(..)` and `%(..)` references through an
//! [`EvaluationContext`]. Expanded text is unescaped exactly once, after all
//! references have been replaced, so escaped text never turns into a
//! reference.

use crate::context::EvaluationContext;
use crate::escaping::unescape_all;

/// Expands every reference in the text of a quoted string.
pub fn expand(text: &str, context: &dyn EvaluationContext) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut expanded = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '$' | '@' | '%') && chars.get(i + 1) == Some(&'(') {
            let close = match c {
                '@' => find_close(&chars, i + 2, true),
                _ => find_close(&chars, i + 2, false),
            };
            if let Some(close) = close {
                let body: String = chars[i + 2..close].iter().collect();
                match c {
                    '$' => expanded.push_str(&raw_property(&body, context)),
                    '@' => expanded.push_str(&raw_item_list(&body, context)),
                    _ => expanded.push_str(&raw_metadata(&body, context)),
                }
                i = close + 1;
                continue;
            }
        }
        expanded.push(c);
        i += 1;
    }

    unescape_all(&expanded)
}

/// Value of the property named by the body of `$(..)`; unset properties are empty.
pub fn property(name: &str, context: &dyn EvaluationContext) -> String {
    unescape_all(&raw_property(name, context))
}

/// Expansion of the body of `@(..)`, e.g. `Compile->'%(Filename)', ';'`.
pub fn item_list(body: &str, context: &dyn EvaluationContext) -> String {
    unescape_all(&raw_item_list(body, context))
}

/// Value of the body of `%(..)`, either `Name` or `Item.Name`.
pub fn metadata(body: &str, context: &dyn EvaluationContext) -> String {
    unescape_all(&raw_metadata(body, context))
}

/// Splits an item list body into the item type and the transform or
/// separator text that follows it.
pub fn split_item_list(body: &str) -> (&str, &str) {
    let body = body.trim_start();
    let end = body
        .char_indices()
        .find(|&(i, c)| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '.') || body[i..].starts_with("->"))
        .map_or(body.len(), |(i, _)| i);
    (&body[..end], body[end..].trim_start())
}

fn raw_property(name: &str, context: &dyn EvaluationContext) -> String {
    context.lookup_property(name.trim()).unwrap_or_default()
}

fn raw_item_list(body: &str, context: &dyn EvaluationContext) -> String {
    let (name, rest) = split_item_list(body);
    context.lookup_item_list(name, rest)
}

fn raw_metadata(body: &str, context: &dyn EvaluationContext) -> String {
    let body = body.trim();
    let (item, name) = body.split_once('.').unwrap_or(("", body));
    context.lookup_metadata(item.trim(), name.trim()).unwrap_or_default()
}

/// Index of the `)` closing a reference whose body starts at `from`.
/// Parentheses inside quotes are skipped when `quote_aware`.
fn find_close(chars: &[char], from: usize, quote_aware: bool) -> Option<usize> {
    let mut depth = 0;
    let mut in_quote = false;
    for (i, &c) in chars.iter().enumerate().skip(from) {
        match c {
            '\'' if quote_aware => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}
