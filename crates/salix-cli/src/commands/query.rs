use std::path::Path;
use std::process;

use serde::Serialize;

use salix_query::{Query, QueryCapture, QueryCursor};

#[derive(Serialize)]
struct CaptureLine<'a> {
    name: &'a str,
    kind: &'a str,
    start_byte: usize,
    end_byte: usize,
    text: &'a str,
}

#[derive(Serialize)]
struct MatchLine<'a> {
    pattern: usize,
    captures: Vec<CaptureLine<'a>>,
}

pub fn run(grammar: &Path, query_path: &Path, file: &Path, captures_only: bool) {
    let language = super::load_language(grammar);
    let pattern_source = super::read_source(query_path);
    let text = super::read_source(file);

    let query = match Query::new(&language, &pattern_source) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("error: {}: {}", query_path.display(), e);
            process::exit(2);
        }
    };

    let tree = super::parse_tree(&language, &text);
    let names = query.capture_names();
    let mut cursor = QueryCursor::new();

    if captures_only {
        for capture in cursor.captures(&query, tree.root_node(), &text) {
            let line = capture_line(&capture, &names, &text);
            println!("{}", serde_json::to_string(&line).expect("capture serializes"));
        }
    } else {
        for found in cursor.matches(&query, tree.root_node(), &text) {
            let line = MatchLine {
                pattern: found.pattern_index,
                captures: found
                    .captures
                    .iter()
                    .map(|c| capture_line(c, &names, &text))
                    .collect(),
            };
            println!("{}", serde_json::to_string(&line).expect("match serializes"));
        }
    }
}

fn capture_line<'a>(
    capture: &QueryCapture<'a>,
    names: &[&'a str],
    text: &'a str,
) -> CaptureLine<'a> {
    CaptureLine {
        name: names[capture.index as usize],
        kind: capture.node.kind(),
        start_byte: capture.node.start_byte(),
        end_byte: capture.node.end_byte(),
        text: capture.node.utf8_text(text),
    }
}
