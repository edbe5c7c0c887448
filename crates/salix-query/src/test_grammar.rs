//! Hand-assembled languages backing the crate's tests, mirroring the
//! fixtures salix-syntax tests with.

use salix_core::{
    Language, LanguageBuilder, LexPattern, LexRule, LexState, ParseAction, ParseState, SYM_END,
};

/// `a -> "b" "c"`, with spaces as extras.
pub fn tiny() -> Language {
    let mut builder = LanguageBuilder::new("tiny");
    let tok_b = builder.named_token("b");
    let tok_c = builder.named_token("c");
    let ws = builder.token("ws");
    let rule_a = builder.rule("a");
    builder.extra(ws);

    let lex = builder.lex_state(LexState {
        rules: vec![
            LexRule::literal(tok_b, "b"),
            LexRule::literal(tok_c, "c"),
            LexRule::chars(ws, vec![(' ', ' '), ('\t', '\t'), ('\n', '\n')]),
        ],
    });

    builder.parse_state(ParseState {
        actions: vec![(tok_b, ParseAction::Shift(1))],
        gotos: vec![(rule_a, 3)],
        lex_state: lex,
    });
    builder.parse_state(ParseState {
        actions: vec![(tok_c, ParseAction::Shift(2))],
        gotos: vec![],
        lex_state: lex,
    });
    builder.parse_state(ParseState {
        actions: vec![(
            SYM_END,
            ParseAction::Reduce {
                symbol: rule_a,
                child_count: 2,
                fields: vec![],
            },
        )],
        gotos: vec![],
        lex_state: lex,
    });
    builder.parse_state(ParseState {
        actions: vec![(SYM_END, ParseAction::Accept)],
        gotos: vec![],
        lex_state: lex,
    });

    builder.build().expect("tiny grammar is well formed")
}

/// A list of parenthesized key/value pairs:
///
/// ```text
/// program -> _items
/// _items  -> item _items | item
/// item    -> "(" pair ")"
/// pair    -> identifier "=" number     (fields key / value)
/// ```
///
/// Extras are whitespace and `#`-to-end-of-line comments.
pub fn pairs() -> Language {
    let mut builder = LanguageBuilder::new("pairs");
    let lp = builder.token("(");
    let rp = builder.token(")");
    let eq = builder.token("=");
    let ident = builder.named_token("identifier");
    let number = builder.named_token("number");
    let ws = builder.token("ws");
    let comment = builder.named_token("comment");
    let program = builder.rule("program");
    let items = builder.rule("_items");
    let item = builder.rule("item");
    let pair = builder.rule("pair");
    builder.extra(ws);
    builder.extra(comment);
    let key = builder.field("key").get();
    let value = builder.field("value").get();

    let lex = builder.lex_state(LexState {
        rules: vec![
            LexRule::literal(lp, "("),
            LexRule::literal(rp, ")"),
            LexRule::literal(eq, "="),
            LexRule::chars(ident, vec![('a', 'z'), ('A', 'Z'), ('_', '_')]),
            LexRule::chars(number, vec![('0', '9')]),
            LexRule::chars(ws, vec![(' ', ' '), ('\t', '\t'), ('\n', '\n')]),
            LexRule::seq(
                comment,
                vec![
                    LexPattern::Literal("#".to_string()),
                    LexPattern::Chars {
                        ranges: vec![(' ', '~')],
                        min: 0,
                        many: true,
                    },
                ],
            ),
        ],
    });

    let reduce_item = ParseAction::Reduce {
        symbol: item,
        child_count: 3,
        fields: vec![],
    };

    // 0: start
    builder.parse_state(ParseState {
        actions: vec![(lp, ParseAction::Shift(1))],
        gotos: vec![(program, 9), (items, 8), (item, 2)],
        lex_state: lex,
    });
    // 1: after "("
    builder.parse_state(ParseState {
        actions: vec![(ident, ParseAction::Shift(3))],
        gotos: vec![(pair, 5)],
        lex_state: lex,
    });
    // 2: after an item; another may follow
    builder.parse_state(ParseState {
        actions: vec![
            (lp, ParseAction::Shift(1)),
            (
                SYM_END,
                ParseAction::Reduce {
                    symbol: items,
                    child_count: 1,
                    fields: vec![],
                },
            ),
        ],
        gotos: vec![(item, 2), (items, 10)],
        lex_state: lex,
    });
    // 3: after the key
    builder.parse_state(ParseState {
        actions: vec![(eq, ParseAction::Shift(4))],
        gotos: vec![],
        lex_state: lex,
    });
    // 4: after "="
    builder.parse_state(ParseState {
        actions: vec![(number, ParseAction::Shift(6))],
        gotos: vec![],
        lex_state: lex,
    });
    // 5: after the pair
    builder.parse_state(ParseState {
        actions: vec![(rp, ParseAction::Shift(7))],
        gotos: vec![],
        lex_state: lex,
    });
    // 6: after the value
    builder.parse_state(ParseState {
        actions: vec![(
            rp,
            ParseAction::Reduce {
                symbol: pair,
                child_count: 3,
                fields: vec![key, 0, value],
            },
        )],
        gotos: vec![],
        lex_state: lex,
    });
    // 7: after ")"
    builder.parse_state(ParseState {
        actions: vec![(lp, reduce_item.clone()), (SYM_END, reduce_item)],
        gotos: vec![],
        lex_state: lex,
    });
    // 8: after all items
    builder.parse_state(ParseState {
        actions: vec![(
            SYM_END,
            ParseAction::Reduce {
                symbol: program,
                child_count: 1,
                fields: vec![],
            },
        )],
        gotos: vec![],
        lex_state: lex,
    });
    // 9: after the program
    builder.parse_state(ParseState {
        actions: vec![(SYM_END, ParseAction::Accept)],
        gotos: vec![],
        lex_state: lex,
    });
    // 10: after item _items
    builder.parse_state(ParseState {
        actions: vec![(
            SYM_END,
            ParseAction::Reduce {
                symbol: items,
                child_count: 2,
                fields: vec![],
            },
        )],
        gotos: vec![],
        lex_state: lex,
    });

    builder.build().expect("pairs grammar is well formed")
}
