use std::path::Path;

use serde::Serialize;

use salix_syntax::Node;

#[derive(Serialize)]
struct NodeLine<'t> {
    kind: &'t str,
    named: bool,
    start_byte: usize,
    end_byte: usize,
    start_row: usize,
    start_column: usize,
    end_row: usize,
    end_column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'t str>,
    has_error: bool,
}

pub fn run(grammar: &Path, file: &Path, json: bool) {
    let language = super::load_language(grammar);
    let text = super::read_source(file);
    let tree = super::parse_tree(&language, &text);
    let root = tree.root_node();

    if json {
        let mut nodes = Vec::new();
        collect(root, &mut nodes);
        let rendered = serde_json::to_string_pretty(&nodes).expect("node list serializes");
        println!("{rendered}");
    } else {
        println!("{}", root.to_sexp());
    }

    if root.has_error() {
        std::process::exit(1);
    }
}

fn collect<'t>(node: Node<'t>, out: &mut Vec<NodeLine<'t>>) {
    let start = node.start_position();
    let end = node.end_position();
    out.push(NodeLine {
        kind: node.kind(),
        named: node.is_named(),
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_row: start.row,
        start_column: start.column,
        end_row: end.row,
        end_column: end.column,
        field: node.field_name(),
        has_error: node.has_error(),
    });
    for child in node.children() {
        collect(child, out);
    }
}
