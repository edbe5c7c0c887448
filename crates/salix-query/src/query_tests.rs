use indoc::indoc;

use crate::error::QueryErrorKind;
use crate::query::{CaptureQuantifier, Query, QueryPredicateArg};
use crate::test_grammar::pairs;

#[test]
fn multi_pattern_sources_with_comments_compile() {
    let source = indoc! {r#"
        ; keys
        (pair key: (identifier) @key)

        ; values
        (pair value: (number) @value)
    "#};
    let query = Query::new(&pairs(), source).unwrap();
    assert_eq!(query.pattern_count(), 2);
    assert_eq!(query.capture_names(), vec!["key", "value"]);
}

#[test]
fn unknown_node_kind_is_rejected_with_its_offset() {
    let err = Query::new(&pairs(), "(function)").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::NodeKind);
    assert_eq!(err.offset, 1);
}

#[test]
fn unknown_field_is_rejected_with_its_offset() {
    let err = Query::new(&pairs(), "(pair nope: (identifier))").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Field);
    assert_eq!(err.offset, 6);
}

#[test]
fn unknown_anonymous_token_is_rejected() {
    let err = Query::new(&pairs(), "\"+\"").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::NodeKind);
}

#[test]
fn non_supertype_slash_notation_is_rejected() {
    let err = Query::new(&pairs(), "(item/pair)").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::NodeKind);
}

#[test]
fn predicate_arity_is_checked() {
    let err = Query::new(&pairs(), "((identifier) @x (#eq? @x))").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Predicate);
}

#[test]
fn predicate_capture_must_exist() {
    let err = Query::new(&pairs(), "((identifier) @x (#eq? @y \"a\"))").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Capture);
}

#[test]
fn invalid_regex_is_rejected() {
    let err = Query::new(&pairs(), "((identifier) @x (#match? @x \"[\"))").unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::Predicate);
}

#[test]
fn capture_names_are_in_discovery_order() {
    let query = Query::new(&pairs(), "(pair key: (identifier) @k value: (number) @v)").unwrap();
    assert_eq!(query.capture_names(), vec!["k", "v"]);
    assert_eq!(query.capture_index_for_name("v"), Some(1));
    assert_eq!(query.capture_index_for_name("missing"), None);
}

#[test]
fn capture_quantifiers_fold_through_nesting() {
    let query = Query::new(
        &pairs(),
        "(program (item)+ @i) (item (pair) @p) [(identifier) @x (number)]",
    )
    .unwrap();
    let i = query.capture_index_for_name("i").unwrap() as usize;
    let p = query.capture_index_for_name("p").unwrap() as usize;
    let x = query.capture_index_for_name("x").unwrap() as usize;

    assert_eq!(query.capture_quantifiers(0)[i], CaptureQuantifier::OneOrMore);
    assert_eq!(query.capture_quantifiers(1)[p], CaptureQuantifier::One);
    assert_eq!(query.capture_quantifiers(2)[x], CaptureQuantifier::ZeroOrOne);
    // Captures a pattern never binds report Zero.
    assert_eq!(query.capture_quantifiers(0)[p], CaptureQuantifier::Zero);
}

#[test]
fn unrecognized_predicates_are_preserved_for_the_caller() {
    let query = Query::new(&pairs(), "((identifier) @x (#fancy? @x \"arg\"))").unwrap();
    let general = query.general_predicates(0);
    assert_eq!(general.len(), 1);
    assert_eq!(&*general[0].operator, "fancy?");
    assert_eq!(general[0].args[0], QueryPredicateArg::Capture(0));
    assert_eq!(general[0].args[1], QueryPredicateArg::String("arg".into()));
}

#[test]
fn property_predicates_and_settings_are_split_out() {
    let query = Query::new(
        &pairs(),
        "((identifier) @x (#is? local) (#is-not? global) (#set! lang \"toml\"))",
    )
    .unwrap();
    let asserts = query.property_predicates(0);
    assert_eq!(asserts.len(), 2);
    assert_eq!(&*asserts[0].0.key, "local");
    assert!(asserts[0].1);
    assert_eq!(&*asserts[1].0.key, "global");
    assert!(!asserts[1].1);

    let settings = query.property_settings(0);
    assert_eq!(settings.len(), 1);
    assert_eq!(&*settings[0].key, "lang");
    assert_eq!(settings[0].value.as_deref(), Some("toml"));
}

#[test]
fn pattern_source_offsets_are_exposed() {
    let query = Query::new(&pairs(), "(item) (pair)").unwrap();
    assert_eq!(query.pattern_count(), 2);
    assert_eq!(query.start_byte_for_pattern(0), Some(0));
    assert_eq!(query.end_byte_for_pattern(0), Some(6));
    assert_eq!(query.start_byte_for_pattern(1), Some(7));
    assert_eq!(query.end_byte_for_pattern(1), Some(13));
    assert_eq!(query.start_byte_for_pattern(2), None);
}

#[test]
fn rootedness_and_locality_analyses() {
    let query = Query::new(&pairs(), "(item) ((item) (item)) (item)+").unwrap();
    assert!(query.is_pattern_rooted(0));
    assert!(!query.is_pattern_non_local(0));
    assert!(!query.is_pattern_rooted(1));
    assert!(query.is_pattern_non_local(1));
    assert!(query.is_pattern_rooted(2));
    assert!(query.is_pattern_non_local(2));
}

#[test]
fn guaranteed_at_step_accounts_for_trailing_optional_steps() {
    let query = Query::new(&pairs(), "(item (pair) (comment)?)").unwrap();
    // Past the required (pair) step only the optional one remains.
    assert!(query.is_pattern_guaranteed_at_step(6));
    // At the pattern start the required step is still ahead.
    assert!(!query.is_pattern_guaranteed_at_step(0));
    // Outside any pattern.
    assert!(!query.is_pattern_guaranteed_at_step(999));
}

#[test]
fn predicates_defeat_the_step_guarantee() {
    let query = Query::new(&pairs(), "((identifier) @x (#eq? @x \"a\"))").unwrap();
    assert!(!query.is_pattern_guaranteed_at_step(2));
}

#[test]
fn disable_pattern_validates_the_index() {
    let mut query = Query::new(&pairs(), "(item)").unwrap();
    assert!(query.disable_pattern(0).is_ok());
    let err = query.disable_pattern(5).unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::PatternIndex);
}
