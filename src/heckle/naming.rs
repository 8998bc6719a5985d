//! Method name to test name mapping used by focus mode.

use super::engine::NamingConvention;
use super::target::{MethodCandidate, MethodKind};

/// Operator method names and the words their tests use.
const OPERATORS: &[(&str, &str)] = &[
    ("<=>", "spaceship"),
    ("===", "equals3"),
    ("[]=", "index_equals"),
    ("==", "equals2"),
    ("=~", "equalstilde"),
    ("<=", "lte"),
    (">=", "gte"),
    ("<<", "lt2"),
    (">>", "gt2"),
    ("**", "times2"),
    ("+@", "uplus"),
    ("-@", "uminus"),
    ("[]", "index"),
    ("<", "lt"),
    (">", "gt"),
    ("+", "plus"),
    ("-", "minus"),
    ("*", "times"),
    ("/", "div"),
    ("%", "percent"),
    ("&", "and"),
    ("|", "or"),
    ("^", "carat"),
    ("~", "tilde"),
    ("!", "not"),
];

/// `test_<method>` naming, with operator and suffix translation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestNameMapping;

impl TestNameMapping {
    /// Test name for a bare method name.
    pub fn normal_to_test(name: &str) -> String {
        let word = if let Some((_, word)) = OPERATORS.iter().find(|(op, _)| *op == name) {
            (*word).to_string()
        } else if let Some(stem) = name.strip_suffix('?') {
            format!("{stem}_eh")
        } else if let Some(stem) = name.strip_suffix('!') {
            format!("{stem}_bang")
        } else if let Some(stem) = name.strip_suffix('=') {
            format!("{stem}_equals")
        } else {
            name.to_string()
        };
        format!("test_{word}")
    }

    /// Test name for a candidate; class methods get a `class_` infix.
    pub fn candidate_to_test(method: &MethodCandidate) -> String {
        let test = Self::normal_to_test(&method.name);
        match method.kind {
            MethodKind::Instance => test,
            MethodKind::Class => test.replacen("test_", "test_class_", 1),
        }
    }
}

impl NamingConvention for TestNameMapping {
    fn method_to_test_pattern(&self, method: &MethodCandidate) -> String {
        regex::escape(&Self::candidate_to_test(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_class_methods() {
        assert_eq!(
            TestNameMapping::candidate_to_test(&MethodCandidate::instance("add")),
            "test_add"
        );
        assert_eq!(
            TestNameMapping::candidate_to_test(&MethodCandidate::class("build")),
            "test_class_build"
        );
    }

    #[test]
    fn operators_and_suffixes() {
        assert_eq!(TestNameMapping::normal_to_test("+"), "test_plus");
        assert_eq!(TestNameMapping::normal_to_test("=="), "test_equals2");
        assert_eq!(TestNameMapping::normal_to_test("[]="), "test_index_equals");
        assert_eq!(TestNameMapping::normal_to_test("empty?"), "test_empty_eh");
        assert_eq!(TestNameMapping::normal_to_test("save!"), "test_save_bang");
        assert_eq!(TestNameMapping::normal_to_test("name="), "test_name_equals");
    }

    #[test]
    fn pattern_is_regex_escaped() {
        let pattern = TestNameMapping.method_to_test_pattern(&MethodCandidate::instance("a.b"));
        assert_eq!(pattern, r"test_a\.b");
    }
}
