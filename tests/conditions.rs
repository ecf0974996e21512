use std::cell::Cell;

use condition_parser::{
    evaluate, ConditionEngine, Diagnostic, EngineConfig, ErrorCode, EvaluationContext, LiteralValue, ParserOptions,
    PropertyBag, SourceLocation, Stage,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn project() -> PropertyBag {
    let mut bag = PropertyBag::new();
    bag.set_property("Configuration", "Debug")
        .set_property("Platform", "AnyCPU")
        .set_property("OutDir", "bin\\Debug\\")
        .set_property("TargetFramework", "net8.0")
        .set_property("LangVersion", "12.0")
        .add_item("Compile", "Program.cs")
        .add_item("Compile", "Util.cs")
        .set_metadata("Compile", "Culture", "fr");
    bag
}

fn eval(condition: &str) -> Result<bool, Diagnostic> {
    evaluate(condition, ParserOptions::AllowAll, &SourceLocation::default(), &project())
}

#[rstest]
#[case("'$(Configuration)|$(Platform)' == 'Debug|AnyCPU'", true)]
#[case("'$(Configuration)|$(Platform)' == 'Release|AnyCPU'", false)]
#[case("'$(TargetFramework)' == 'NET8.0'", true)]
#[case("'$(LangVersion)' >= '11.0' and '$(LangVersion)' < 13", true)]
#[case("HasTrailingSlash('$(OutDir)')", true)]
#[case("!HasTrailingSlash('$(Configuration)')", true)]
#[case("'@(Compile)' != ''", true)]
#[case("'@(Compile->'%(Identity).bak')' == 'Program.cs.bak;Util.cs.bak'", true)]
#[case("'%(Compile.Culture)' == 'fr'", true)]
#[case("'$(Undefined)' == ''", true)]
#[case("$(Undefined) == ''", true)]
#[case("((true)) and !(false or false)", true)]
#[case("VersionLessThan('$(LangVersion)', '12.1')", true)]
fn test_conditions(#[case] condition: &str, #[case] expected: bool) {
    assert_eq!(eval(condition), Ok(expected), "condition {:?}", condition);
}

#[rstest]
#[case("Current", true)]
#[case("16.0", true)]
#[case("14.0", false)]
fn test_tools_version_guard(#[case] tools_version: &str, #[case] expected: bool) {
    let mut bag = PropertyBag::new();
    bag.set_property("MSBuildToolsVersion", tools_version);
    let condition = "'$(MSBuildToolsVersion)' == 'Current' or '$(MSBuildToolsVersion)' >= '15.0'";
    assert_eq!(evaluate(condition, ParserOptions::AllowAll, &SourceLocation::default(), &bag), Ok(expected));
}

#[rstest]
#[case("15.0", false, true)]
#[case("16.0", true, true)]
#[case("17.4.1", true, true)]
#[case("15.0.0.1", true, true)]
fn test_tools_version_compares_as_version(#[case] tools_version: &str, #[case] above_fifteen: bool, #[case] above_fourteen: bool) {
    let mut bag = PropertyBag::new();
    bag.set_property("ToolsVersion", tools_version);
    let location = SourceLocation::default();
    let fifteen = evaluate("'15.0' < '$(ToolsVersion)'", ParserOptions::AllowAll, &location, &bag);
    let fourteen = evaluate("'14.0.0.0' < '$(ToolsVersion)'", ParserOptions::AllowAll, &location, &bag);
    assert_eq!((fifteen.clone(), fourteen.clone()), (Ok(above_fifteen), Ok(above_fourteen)));
    if tools_version != "15.0" {
        assert_eq!(fifteen, fourteen, "tools version {:?}", tools_version);
    }
}

#[rstest]
#[case("Current", true)]
#[case("current", true)]
#[case("CURRENT", true)]
#[case("Current ", false)]
#[case("16.0", false)]
#[case("", false)]
fn test_current_comparison_ignores_case(#[case] tools_version: &str, #[case] expected: bool) {
    let mut bag = PropertyBag::new();
    bag.set_property("MSBuildToolsVersion", tools_version);
    let result = evaluate("'$(MSBuildToolsVersion)' == 'Current'", ParserOptions::AllowAll, &SourceLocation::default(), &bag);
    assert_eq!(result, Ok(expected), "tools version {:?}", tools_version);
}

#[test]
fn test_tools_version_guard_without_short_circuit_fails() {
    let mut bag = PropertyBag::new();
    bag.set_property("MSBuildToolsVersion", "Current");
    let error = evaluate("'$(MSBuildToolsVersion)' >= '15.0'", ParserOptions::AllowAll, &SourceLocation::default(), &bag)
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ComparisonOnNonNumericExpression);
    assert_eq!(error.offset, 1);
}

#[test]
fn test_empty_and_whitespace() {
    assert_eq!(eval(""), Ok(true));
    let error = eval(" ").unwrap_err();
    assert_eq!(error.code, ErrorCode::UnexpectedTokenInCondition);
    assert_eq!(error.offset, 2);
    assert_eq!(error.unexpected_token.as_deref(), Some("EndOfInput"));
}

#[rstest]
#[case("1==1.1.", ErrorCode::UnexpectedCharacterInCondition, 7)]
#[case("1234=5678", ErrorCode::IllFormedEqualsInCondition, 6)]
#[case(" (", ErrorCode::UnexpectedTokenInCondition, 3)]
#[case(" false or  ", ErrorCode::UnexpectedTokenInCondition, 12)]
#[case(" 'foo", ErrorCode::IllFormedQuotedStringInCondition, 2)]
#[case(" $(foo", ErrorCode::IllFormedPropertyCloseParenthesisInCondition, 2)]
#[case(" @(foo", ErrorCode::IllFormedItemListCloseParenthesisInCondition, 2)]
#[case("'%24%28x' == '%24(x''", ErrorCode::IllFormedQuotedStringInCondition, 21)]
#[case("1 == 1 == 1", ErrorCode::UnexpectedTokenInCondition, 8)]
#[case("!'x'", ErrorCode::ExpectedBooleanInCondition, 2)]
#[case("'abc' < 5", ErrorCode::ComparisonOnNonNumericExpression, 1)]
#[case("Foo()", ErrorCode::UndefinedFunctionCall, 1)]
#[case("HasTrailingSlash('a', 'b')", ErrorCode::IncorrectNumberOfFunctionArguments, 1)]
fn test_error_positions(#[case] condition: &str, #[case] code: ErrorCode, #[case] offset: usize) {
    let error = eval(condition).unwrap_err();
    assert_eq!((error.code, error.offset), (code, offset), "condition {:?}", condition);
    assert_eq!(error.condition, condition);
}

#[rstest]
#[case(" @(foo)", 2)]
#[case(" '@(foo)'", 3)]
fn test_item_lists_rejected_in_property_conditions(#[case] condition: &str, #[case] offset: usize) {
    let error = evaluate(condition, ParserOptions::AllowProperties, &SourceLocation::default(), &project()).unwrap_err();
    assert_eq!(error.code, ErrorCode::ItemListNotAllowedInThisConditional);
    assert_eq!(error.offset, offset);
    assert_eq!(error.stage(), Stage::Syntactic);
}

#[test]
fn test_properties_allowed_in_property_conditions() {
    let result = evaluate("'$(Configuration)' == 'Debug'", ParserOptions::AllowProperties, &SourceLocation::default(), &project());
    assert_eq!(result, Ok(true));
}

#[test]
fn test_nesting_limit() {
    let ok = format!("{}true{}", "(".repeat(40), ")".repeat(40));
    assert_eq!(eval(&ok), Ok(true));

    let deep = format!("{}true{}", "(".repeat(52), ")".repeat(52));
    let error = eval(&deep).unwrap_err();
    assert_eq!(error.code, ErrorCode::ConditionNestedTooDeeply);
    assert_eq!(error.offset, 51);
    assert_eq!(error.stage(), Stage::Resource);
}

#[test]
fn test_values_are_unescaped_once() {
    let mut bag = PropertyBag::new();
    bag.set_property("Escaped", "%2520");
    let location = SourceLocation::default();
    assert_eq!(evaluate("'$(Escaped)' == '%2520'", ParserOptions::AllowAll, &location, &bag), Ok(true));
    assert_eq!(evaluate("$(Escaped) == '%25%32%30'", ParserOptions::AllowAll, &location, &bag), Ok(true));
    assert_eq!(evaluate("'%24%28Escaped%29' == '$(Escaped)'", ParserOptions::AllowAll, &location, &bag), Ok(false));
}

#[rstest]
#[case(" or ", false)]
#[case(" and ", true)]
fn test_huge_flat_chain(#[case] joiner: &str, #[case] term: bool) {
    let source = vec![if term { "true" } else { "false" }; 200_000].join(joiner);
    assert_eq!(eval(&source), Ok(term));

    let engine = ConditionEngine::default();
    let tree = engine.parse(&source, &SourceLocation::default()).unwrap();
    assert_eq!(tree.to_string().len(), source.len() + 2);
    drop(tree);
}

/// Counts function calls; any property lookup is a failure.
#[derive(Default)]
struct Counting {
    calls: Cell<usize>,
}

impl EvaluationContext for Counting {
    fn lookup_property(&self, name: &str) -> Option<String> {
        panic!("property {} should not be read", name)
    }

    fn lookup_item_list(&self, name: &str, _: &str) -> String {
        panic!("item list {} should not be read", name)
    }

    fn lookup_metadata(&self, _: &str, name: &str) -> Option<String> {
        panic!("metadata {} should not be read", name)
    }

    fn call_function(&self, _: &str, _: &[LiteralValue]) -> Result<LiteralValue, Diagnostic> {
        self.calls.set(self.calls.get() + 1);
        Ok(LiteralValue::Bool(true))
    }
}

#[test]
fn test_short_circuit_skips_lookups_and_calls() {
    let context = Counting::default();
    let location = SourceLocation::default();
    assert_eq!(evaluate("Check() or $(Never) or @(Never)", ParserOptions::AllowAll, &location, &context), Ok(true));
    assert_eq!(evaluate("false and Check() and $(Never)", ParserOptions::AllowAll, &location, &context), Ok(false));
    assert_eq!(context.calls.get(), 1);
}

#[test]
fn test_same_input_same_result() {
    let condition = "'$(Configuration)' == 'Debug' and '@(Compile)' != '' and !HasTrailingSlash('$(Platform)')";
    let first = eval(condition);
    for _ in 0..10 {
        assert_eq!(eval(condition), first);
    }
    assert_eq!(eval("'abc' < 5"), eval("'abc' < 5"));
}

#[test]
fn test_engine_from_config() {
    let config = EngineConfig::from_json_str(r#"{ "options": "allow_properties", "max_depth": 3 }"#).unwrap();
    let engine = ConditionEngine::new(config).unwrap();
    let location = SourceLocation::new("Directory.Build.props", 7, 23);

    assert_eq!(engine.evaluate("(('$(Configuration)' == 'Debug'))", &location, &project()), Ok(true));

    let error = engine.evaluate("@(Compile) == ''", &location, &project()).unwrap_err();
    assert_eq!(error.code, ErrorCode::ItemListNotAllowedInThisConditional);
    assert!(error.to_string().starts_with("Directory.Build.props(7,23): error ItemListNotAllowedInThisConditional"));

    let report = error.render();
    assert!(report.contains("ItemListNotAllowedInThisConditional"));
    assert!(report.contains("Directory.Build.props"));
}
