use std::cell::RefCell;
use std::rc::Rc;

use salix_core::{InputEdit, Language, Point, Range};

use crate::input::{CallbackInput, SliceInput};
use crate::parser::{IncludedRangesError, ParseOptions, ParseProgress, Parser};
use crate::test_grammars::{pairs, tiny};
use crate::tree::Tree;

fn parse(language: &Language, text: &str) -> Tree {
    let mut parser = Parser::new();
    parser.set_language(language).unwrap();
    parser.parse(text, None).expect("parse completes")
}

fn insertion(byte: usize, column: usize, len: usize) -> InputEdit {
    InputEdit {
        start_byte: byte,
        old_end_byte: byte,
        new_end_byte: byte + len,
        start_point: Point::new(0, column),
        old_end_point: Point::new(0, column),
        new_end_point: Point::new(0, column + len),
    }
}

#[test]
fn parses_a_simple_sequence() {
    let language = tiny();
    let tree = parse(&language, "bc");
    let root = tree.root_node();

    assert_eq!(root.to_sexp(), "(a (b) (c))");
    assert_eq!(root.kind(), "a");
    assert_eq!(root.start_byte(), 0);
    assert_eq!(root.end_byte(), 2);
    assert_eq!(root.start_position(), Point::new(0, 0));
    assert_eq!(root.end_position(), Point::new(0, 2));
    assert_eq!(root.child_count(), 2);
    assert!(!root.has_error());
    assert_eq!(root.child(0).unwrap().utf8_text("bc"), "b");
    assert_eq!(root.child(1).unwrap().utf8_text("bc"), "c");
}

#[test]
fn extras_attach_between_real_children() {
    let language = tiny();
    let tree = parse(&language, "b c");
    let root = tree.root_node();

    // The whitespace is in the tree but invisible in the s-expression.
    assert_eq!(root.to_sexp(), "(a (b) (c))");
    assert_eq!(root.child_count(), 3);
    let ws = root.child(1).unwrap();
    assert_eq!(ws.kind(), "ws");
    assert!(ws.is_extra());
    assert!(!ws.is_named());
    assert_eq!(root.named_child_count(), 2);
    assert_eq!(root.end_byte(), 3);
}

#[test]
fn inserts_a_missing_token_when_one_repairs_the_parse() {
    let language = tiny();
    let tree = parse(&language, "b");
    let root = tree.root_node();

    assert_eq!(root.to_sexp(), "(a (b) (MISSING c))");
    assert!(root.has_error());

    let missing = root.child(1).unwrap();
    assert!(missing.is_missing());
    assert_eq!(missing.start_byte(), 1);
    assert_eq!(missing.end_byte(), 1);
    assert!(!root.child(0).unwrap().has_error());
}

#[test]
fn missing_insertion_can_start_a_rule() {
    let language = tiny();
    let tree = parse(&language, "c");
    let root = tree.root_node();

    assert_eq!(root.to_sexp(), "(a (MISSING b) (c))");
    assert!(root.has_error());
}

#[test]
fn lexical_garbage_becomes_an_error_leaf() {
    let language = tiny();
    let tree = parse(&language, "bxc");
    let root = tree.root_node();

    assert_eq!(root.to_sexp(), "(a (b) (ERROR) (c))");
    assert!(root.has_error());
    let error = root.child(1).unwrap();
    assert!(error.is_error());
    assert_eq!(error.start_byte(), 1);
    assert_eq!(error.end_byte(), 2);
}

#[test]
fn unexpected_tokens_are_skipped_into_an_error_node() {
    let language = tiny();
    let tree = parse(&language, "bcc");
    let root = tree.root_node();

    assert_eq!(root.to_sexp(), "(a (b) (c) (ERROR (c)))");
    assert!(root.has_error());
    assert_eq!(root.end_byte(), 3);
}

#[test]
fn trailing_extras_do_not_stall_a_reduction() {
    let language = tiny();
    let tree = parse(&language, "bc ");
    let root = tree.root_node();

    assert_eq!(root.to_sexp(), "(a (b) (c))");
    assert_eq!(root.end_byte(), 3);
    assert!(!root.has_error());
}

#[test]
fn empty_input_yields_an_empty_error_root() {
    let language = tiny();
    let tree = parse(&language, "");
    let root = tree.root_node();

    assert!(root.is_error());
    assert!(root.has_error());
    assert_eq!(root.child_count(), 0);
    assert_eq!(root.start_byte(), 0);
    assert_eq!(root.end_byte(), 0);
}

#[test]
fn reparse_without_edits_reuses_the_whole_tree() {
    let language = tiny();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let old = parser.parse("bc", None).unwrap();
    let new = parser.parse("bc", Some(&old)).unwrap();

    assert_eq!(old.root_node().id(), new.root_node().id());
    assert_eq!(new.root_node().to_sexp(), "(a (b) (c))");
}

#[test]
fn nodes_before_an_insertion_keep_their_identity() {
    let language = tiny();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let mut old = parser.parse("bc", None).unwrap();
    let old_b = old.root_node().child(0).unwrap().id();
    let old_c = old.root_node().child(1).unwrap().id();

    // "bc" -> "b c"
    old.edit(&insertion(1, 1, 1));
    let new = parser.parse("b c", Some(&old)).unwrap();
    let root = new.root_node();

    assert_eq!(root.to_sexp(), "(a (b) (c))");
    let b = root.child(0).unwrap();
    assert_eq!(b.id(), old_b, "the unchanged token is reused");
    assert_eq!(b.start_byte(), 0);
    assert_eq!(b.end_byte(), 1);

    let c = root.child(2).unwrap();
    assert_ne!(c.id(), old_c, "the shifted token is re-lexed");
    assert_eq!(c.start_byte(), 2);
    assert_eq!(c.end_byte(), 3);
}

#[test]
fn edited_nodes_are_never_reused() {
    let language = tiny();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let mut old = parser.parse("bc", None).unwrap();
    let old_b = old.root_node().child(0).unwrap().id();
    let old_c = old.root_node().child(1).unwrap().id();

    // Overwrite the "c" with identical text; the span still counts as
    // changed.
    old.edit(&InputEdit {
        start_byte: 1,
        old_end_byte: 2,
        new_end_byte: 2,
        start_point: Point::new(0, 1),
        old_end_point: Point::new(0, 2),
        new_end_point: Point::new(0, 2),
    });
    let new = parser.parse("bc", Some(&old)).unwrap();

    assert_eq!(new.root_node().child(0).unwrap().id(), old_b);
    assert_ne!(new.root_node().child(1).unwrap().id(), old_c);
}

#[test]
fn insertion_at_a_token_right_edge_relexes_across_it() {
    let language = pairs();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let mut old = parser.parse("(ab=1)", None).unwrap();
    // "(ab=1)" -> "(abc=1)": the inserted character lands exactly where
    // the identifier ends and extends it, so the old token must not be
    // reused.
    old.edit(&insertion(3, 3, 1));
    let new = parser.parse("(abc=1)", Some(&old)).unwrap();
    let root = new.root_node();

    assert_eq!(
        root.to_sexp(),
        "(program (item (pair key: (identifier) value: (number))))"
    );
    let fresh = parser.parse("(abc=1)", None).unwrap();
    assert_eq!(root.to_sexp(), fresh.root_node().to_sexp());

    let pair = root.named_child(0).unwrap().named_child(0).unwrap();
    let key = pair.child_by_field_name("key").unwrap();
    assert_eq!(key.start_byte(), 1);
    assert_eq!(key.end_byte(), 4);
    let value = pair.child_by_field_name("value").unwrap();
    assert_eq!(value.start_byte(), 5);
    assert_eq!(value.end_byte(), 6);
}

#[test]
fn cancelled_parse_resumes_from_its_checkpoint() {
    let language = tiny();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let mut calls = 0;
    let mut progress = |_: &ParseProgress| {
        calls += 1;
        calls >= 2
    };
    let mut input = SliceInput::new(b"b c");
    let cancelled = parser.parse_with(
        &mut input,
        None,
        ParseOptions {
            progress: Some(&mut progress),
        },
    );
    assert!(cancelled.is_none());

    // The next call picks up where the last one stopped.
    let tree = parser.parse("b c", None).unwrap();
    assert_eq!(tree.root_node().to_sexp(), "(a (b) (c))");
    assert_eq!(tree.root_node().end_byte(), 3);
}

#[test]
fn reset_discards_the_checkpoint() {
    let language = tiny();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let mut progress = |_: &ParseProgress| true;
    let mut input = SliceInput::new(b"b c");
    assert!(parser
        .parse_with(
            &mut input,
            None,
            ParseOptions {
                progress: Some(&mut progress),
            },
        )
        .is_none());

    parser.reset();
    let tree = parser.parse("bc", None).unwrap();
    assert_eq!(tree.root_node().to_sexp(), "(a (b) (c))");
    assert_eq!(tree.root_node().end_byte(), 2);
}

#[test]
fn included_ranges_must_be_ordered_and_disjoint() {
    let mut parser = Parser::new();

    let a = Range::new(0, 4, Point::new(0, 0), Point::new(0, 4));
    let b = Range::new(4, 8, Point::new(0, 4), Point::new(0, 8));
    let overlapping = Range::new(2, 6, Point::new(0, 2), Point::new(0, 6));

    assert!(parser.set_included_ranges(&[a, b]).is_ok());
    assert_eq!(
        parser.set_included_ranges(&[a, overlapping]),
        Err(IncludedRangesError(1))
    );

    let backwards = Range {
        start_byte: 5,
        end_byte: 2,
        start_point: Point::new(0, 5),
        end_point: Point::new(0, 2),
    };
    assert_eq!(
        parser.set_included_ranges(&[backwards]),
        Err(IncludedRangesError(0))
    );
}

#[test]
fn parsing_is_confined_to_included_ranges() {
    let language = tiny();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let range = Range::new(1, 3, Point::new(0, 1), Point::new(0, 3));
    parser.set_included_ranges(&[range]).unwrap();

    let tree = parser.parse("xbcx", None).unwrap();
    let root = tree.root_node();
    assert_eq!(root.to_sexp(), "(a (b) (c))");
    assert_eq!(root.start_byte(), 1);
    assert_eq!(root.end_byte(), 3);
    assert_eq!(tree.included_ranges(), &[range]);
}

#[test]
fn parse_without_a_language_returns_none() {
    let mut parser = Parser::new();
    assert!(parser.parse("bc", None).is_none());
}

#[test]
fn logger_receives_parse_and_lex_messages() {
    let language = tiny();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();

    let messages = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&messages);
    parser.set_logger(Some(Box::new(move |_, msg| {
        sink.borrow_mut().push(msg.to_string());
    })));

    parser.parse("bc", None).unwrap();
    let messages = messages.borrow();
    assert!(messages.iter().any(|m| m.contains("shift")));
    assert!(messages.iter().any(|m| m.contains("reduce")));
    assert!(messages.iter().any(|m| m.contains("token")));
}

#[test]
fn parses_through_a_chunked_callback() {
    let language = pairs();
    let text = b"(a=1)";
    let mut input = CallbackInput::new(|byte, _point| {
        let end = (byte + 2).min(text.len());
        text.get(byte..end).map(<[u8]>::to_vec).unwrap_or_default()
    });

    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    let tree = parser
        .parse_with(&mut input, None, ParseOptions::default())
        .unwrap();

    assert_eq!(
        tree.root_node().to_sexp(),
        "(program (item (pair key: (identifier) value: (number))))"
    );
}

// ---------------------------------------------------------------------------
// The pairs grammar: hidden rules, fields, extras, recovery.
// ---------------------------------------------------------------------------

#[test]
fn fields_label_the_pair_children() {
    let language = pairs();
    let tree = parse(&language, "(a=1)");
    let root = tree.root_node();

    assert_eq!(
        root.to_sexp(),
        "(program (item (pair key: (identifier) value: (number))))"
    );

    let item = root.named_child(0).unwrap();
    let pair = item.named_child(0).unwrap();

    let key = pair.child_by_field_name("key").unwrap();
    assert_eq!(key.kind(), "identifier");
    assert_eq!(key.field_name(), Some("key"));
    assert_eq!(key.utf8_text("(a=1)"), "a");

    let value = pair.child_by_field_name("value").unwrap();
    assert_eq!(value.kind(), "number");
    assert_eq!(value.utf8_text("(a=1)"), "1");

    // Punctuation carries no field.
    assert_eq!(item.child(0).unwrap().kind(), "(");
    assert_eq!(item.child(0).unwrap().field_name(), None);
}

#[test]
fn hidden_rules_splice_into_the_parent() {
    let language = pairs();
    let tree = parse(&language, "(a=1) (b=22)");
    let root = tree.root_node();

    // The _items chain never shows up as a node.
    assert_eq!(
        root.to_sexp(),
        "(program \
         (item (pair key: (identifier) value: (number))) \
         (item (pair key: (identifier) value: (number))))"
    );
    assert_eq!(root.kind(), "program");
    assert_eq!(root.named_child_count(), 2);

    let second = root.named_child(1).unwrap();
    assert_eq!(second.start_byte(), 6);
    assert_eq!(second.end_byte(), 12);
}

#[test]
fn missing_value_is_inserted_inside_the_pair() {
    let language = pairs();
    let tree = parse(&language, "(a=)");
    let root = tree.root_node();

    assert_eq!(
        root.to_sexp(),
        "(program (item (pair key: (identifier) value: (MISSING number))))"
    );
    assert!(root.has_error());

    let pair = root.named_child(0).unwrap().named_child(0).unwrap();
    let value = pair.child_by_field_name("value").unwrap();
    assert!(value.is_missing());
    assert_eq!(value.start_byte(), 3);
    assert_eq!(value.end_byte(), 3);
}

#[test]
fn skipped_tokens_stay_inside_the_enclosing_item() {
    let language = pairs();
    let tree = parse(&language, "(a=1 x)");
    let root = tree.root_node();

    assert_eq!(
        root.to_sexp(),
        "(program (item (pair key: (identifier) value: (number)) (ERROR (identifier))))"
    );
    assert!(root.has_error());

    let item = root.named_child(0).unwrap();
    let pair = item.named_child(0).unwrap();
    assert!(!pair.has_error());
}

#[test]
fn comments_are_named_extras() {
    let language = pairs();
    let source = "(a=1) # done";
    let tree = parse(&language, source);
    let root = tree.root_node();

    assert_eq!(
        root.to_sexp(),
        "(program (item (pair key: (identifier) value: (number))) (comment))"
    );

    let comment = root.named_child(1).unwrap();
    assert!(comment.is_extra());
    assert!(comment.is_named());
    assert_eq!(comment.utf8_text(source), "# done");
    assert_eq!(root.end_byte(), source.len());
}

#[test]
fn truncated_input_recovers_at_end_of_file() {
    let language = pairs();
    let tree = parse(&language, "(a=1");
    let root = tree.root_node();

    assert_eq!(
        root.to_sexp(),
        "(program (item (pair key: (identifier) value: (number)) (MISSING \")\")))"
    );
    assert!(root.has_error());
}

#[test]
fn root_views_can_be_offset_for_embedding() {
    let language = tiny();
    let tree = parse(&language, "bc");

    let root = tree.root_node_with_offset(10, Point::new(2, 0));
    assert_eq!(root.start_byte(), 10);
    assert_eq!(root.end_byte(), 12);
    assert_eq!(root.start_position(), Point::new(2, 0));
    assert_eq!(root.end_position(), Point::new(2, 2));

    let c = root.child(1).unwrap();
    assert_eq!(c.start_byte(), 11);
    assert_eq!(c.start_position(), Point::new(2, 1));
}

#[test]
fn language_version_is_checked_on_install() {
    let language = tiny();
    assert_eq!(language.abi_version(), salix_core::LANGUAGE_VERSION);

    let mut parser = Parser::new();
    assert!(parser.set_language(&language).is_ok());
    assert!(parser.language().is_some_and(|l| l.ptr_eq(&language)));

    parser.clear_language();
    assert!(parser.language().is_none());
}
