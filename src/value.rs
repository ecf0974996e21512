//! Values flowing through evaluation and the coercions between them.
//!
//! Every coercion is total: it returns `None` instead of failing, and the
//! evaluator turns `None` into the matching diagnostic.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Str(String),
    Number(f64),
    Bool(bool),
}

impl LiteralValue {

    /// Text used by equality comparisons and passed to string-typed functions.
    pub fn as_text(&self) -> String {
        match self {
            LiteralValue::Str(s) => s.clone(),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::Bool(b) => b.to_string(),
        }
    }

    /// `true`/`false` in any case are booleans; nothing else is.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralValue::Bool(b) => Some(*b),
            LiteralValue::Str(s) => parse_bool(s),
            LiteralValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            LiteralValue::Number(n) => Some(*n),
            LiteralValue::Str(s) => parse_number(s),
            LiteralValue::Bool(_) => None,
        }
    }

    pub fn as_version(&self) -> Option<Version> {
        match self {
            LiteralValue::Str(s) => Version::parse(s),
            LiteralValue::Number(n) if *n >= 0.0 && n.is_finite() => Version::parse(&n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.as_text())
    }
}

pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses decimal (`-12`, `+1.5`, `1234.`, `.5`) or hexadecimal (`0x1F`)
/// numbers. No exponents, no thousands separators, no locale.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return u64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }

    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (integral, fraction) = match unsigned.split_once('.') {
        Some((integral, fraction)) => (integral, fraction),
        None => (unsigned, ""),
    };
    let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (integral.is_empty() && fraction.is_empty()) || !digits_only(integral) || !digits_only(fraction) {
        return None;
    }

    let magnitude: f64 = format!("{}.{}0", if integral.is_empty() { "0" } else { integral }, fraction).parse().ok()?;
    Some(if text.starts_with('-') { -magnitude } else { magnitude })
}

/// A dotted version with one to four numeric components. Missing trailing
/// components compare as zero, so `15.0` equals `15.0.0.0`.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    const MAX_COMPONENTS: usize = 4;

    pub fn parse(text: &str) -> Option<Version> {
        let text = text.trim();
        let mut components = Vec::new();
        for part in text.split('.') {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            components.push(part.parse().ok()?);
        }
        if components.len() > Self::MAX_COMPONENTS {
            return None;
        }
        Some(Version { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (0..Self::MAX_COMPONENTS)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1234", Some(1234.0))]
    #[case("-1234", Some(-1234.0))]
    #[case("+1234", Some(1234.0))]
    #[case("1234.", Some(1234.0))]
    #[case(".1234", Some(0.1234))]
    #[case("-.5", Some(-0.5))]
    #[case(" 42 ", Some(42.0))]
    #[case("0x1234", Some(4660.0))]
    #[case("0XabCD", Some(43981.0))]
    #[case("0x", None)]
    #[case("0xG", None)]
    #[case(".", None)]
    #[case("-", None)]
    #[case("", None)]
    #[case("1.2.3", None)]
    #[case("1e5", None)]
    #[case("inf", None)]
    #[case("NaN", None)]
    #[case("abc", None)]
    fn test_parse_number(#[case] text: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(text), expected, "input {:?}", text);
    }

    #[rstest]
    #[case("true", Some(true))]
    #[case("TRUE", Some(true))]
    #[case("False", Some(false))]
    #[case("yes", None)]
    #[case("1", None)]
    fn test_parse_bool(#[case] text: &str, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool(text), expected);
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(Version::parse("14.0.0.0").unwrap().components(), &[14, 0, 0, 0]);
        assert_eq!(Version::parse("16").unwrap().components(), &[16]);
        assert!(Version::parse("1.2.3.4.5").is_none());
        assert!(Version::parse("1..2").is_none());
        assert!(Version::parse("1.2.").is_none());
        assert!(Version::parse("-1.0").is_none());
        assert!(Version::parse("Current").is_none());
    }

    #[test]
    fn test_version_missing_components_are_zero() {
        let short = Version::parse("15.0").unwrap();
        let long = Version::parse("15.0.0.0").unwrap();
        assert_eq!(short, long);
        assert!(Version::parse("14.0.0.0").unwrap() < short);
        assert!(Version::parse("15.0.0.1").unwrap() > short);
        assert!(Version::parse("1.10").unwrap() > Version::parse("1.9").unwrap());
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(LiteralValue::Number(1.0).as_text(), "1");
        assert_eq!(LiteralValue::Number(1.5).as_text(), "1.5");
        assert_eq!(LiteralValue::Bool(true).as_text(), "true");
        assert_eq!(LiteralValue::Str("TRUE".into()).as_bool(), Some(true));
        assert_eq!(LiteralValue::Number(0.0).as_bool(), None);
        assert_eq!(LiteralValue::Bool(true).as_number(), None);
        assert_eq!(LiteralValue::Str("0x10".into()).as_number(), Some(16.0));
        assert_eq!(LiteralValue::Number(16.0).as_version(), Version::parse("16"));
        assert_eq!(LiteralValue::Number(-1.0).as_version(), None);
    }
}
