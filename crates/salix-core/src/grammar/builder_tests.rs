use crate::grammar::{BuildError, LanguageBuilder, LexRule, LexState, ParseAction, ParseState};
use crate::Language;

/// Minimal fixture grammar: `a -> b c`.
fn tiny_language() -> Language {
    let mut builder = LanguageBuilder::new("tiny");
    let b = builder.token("b");
    let c = builder.token("c");
    let a = builder.rule("a");

    let lex = builder.lex_state(LexState {
        rules: vec![LexRule::literal(b, "b"), LexRule::literal(c, "c")],
    });

    // s0: b -> shift s1; goto a -> s3
    // s1: c -> shift s2
    // s2: end -> reduce a(2)
    // s3: end -> accept
    builder.parse_state(ParseState {
        actions: vec![(b, ParseAction::Shift(1))],
        gotos: vec![(a, 3)],
        lex_state: lex,
    });
    builder.parse_state(ParseState {
        actions: vec![(c, ParseAction::Shift(2))],
        gotos: vec![],
        lex_state: lex,
    });
    builder.parse_state(ParseState {
        actions: vec![(
            0,
            ParseAction::Reduce {
                symbol: a,
                child_count: 2,
                fields: vec![],
            },
        )],
        gotos: vec![],
        lex_state: lex,
    });
    builder.parse_state(ParseState {
        actions: vec![(0, ParseAction::Accept)],
        gotos: vec![],
        lex_state: lex,
    });

    builder.build().unwrap()
}

#[test]
fn kinds_are_deduplicated_and_looked_up() {
    let mut builder = LanguageBuilder::new("dedup");
    let first = builder.token("+");
    let second = builder.token("+");
    assert_eq!(first, second);

    let rule = builder.rule("expr");
    assert_ne!(rule, first);
}

#[test]
fn hidden_rules_are_invisible() {
    let mut builder = LanguageBuilder::new("hidden");
    let items = builder.rule("_items");
    let program = builder.rule("program");
    builder.lex_state(LexState::default());
    builder.parse_state(ParseState::default());
    let lang = builder.build().unwrap();

    assert!(!lang.node_kind_is_visible(items));
    assert!(lang.node_kind_is_visible(program));
    assert!(lang.node_kind_is_named(items));
}

#[test]
fn build_installs_error_kind() {
    let lang = tiny_language();
    let err = lang.error_symbol();
    assert_eq!(lang.node_kind_for_id(err), Some("ERROR"));
    assert!(lang.node_kind_is_named(err));
}

#[test]
fn name_and_field_lookups() {
    let mut builder = LanguageBuilder::new("fields");
    let pair = builder.rule("pair");
    let key = builder.field("key");
    let value = builder.field("value");
    builder.lex_state(LexState::default());
    builder.parse_state(ParseState::default());
    let lang = builder.build().unwrap();

    assert_eq!(lang.id_for_node_kind("pair", true), Some(pair));
    assert_eq!(lang.id_for_node_kind("pair", false), None);
    assert_eq!(lang.field_id_for_name("key"), Some(key));
    assert_eq!(lang.field_name_for_id(value), Some("value"));
    assert_eq!(lang.field_count(), 2);
}

#[test]
fn rejects_dangling_state_reference() {
    let mut builder = LanguageBuilder::new("bad");
    let b = builder.token("b");
    builder.lex_state(LexState::default());
    builder.parse_state(ParseState {
        actions: vec![(b, ParseAction::Shift(7))],
        gotos: vec![],
        lex_state: 0,
    });
    assert!(matches!(
        builder.build(),
        Err(BuildError::StateOutOfRange(0, 7))
    ));
}

#[test]
fn rejects_dangling_lex_state() {
    let mut builder = LanguageBuilder::new("bad");
    builder.parse_state(ParseState {
        actions: vec![],
        gotos: vec![],
        lex_state: 3,
    });
    assert!(matches!(
        builder.build(),
        Err(BuildError::LexStateOutOfRange(0, 3))
    ));
}

#[test]
fn language_round_trips_through_artifact() {
    let lang = tiny_language();
    let bytes = lang.to_bytes();
    let reloaded = Language::from_bytes(&bytes).unwrap();

    assert_eq!(reloaded.name(), "tiny");
    assert_eq!(reloaded.node_kind_count(), lang.node_kind_count());
    assert_eq!(
        reloaded.id_for_node_kind("a", true),
        lang.id_for_node_kind("a", true)
    );
    assert_eq!(reloaded.parse_state_count(), lang.parse_state_count());
}

#[test]
fn supertype_lookups() {
    let mut builder = LanguageBuilder::new("super");
    let expr = builder.rule("expression");
    let ident = builder.named_token("identifier");
    let number = builder.named_token("number");
    builder.supertype(expr, vec![ident, number]);
    builder.lex_state(LexState::default());
    builder.parse_state(ParseState::default());
    let lang = builder.build().unwrap();

    assert!(lang.node_kind_is_supertype(expr));
    assert!(!lang.node_kind_is_supertype(ident));
    assert_eq!(lang.subtypes_for_supertype(expr), &[ident, number]);
    assert!(lang.subtypes_for_supertype(ident).is_empty());
}
