pub mod parse;
pub mod query;

use std::path::Path;
use std::process;

use salix_core::Language;
use salix_syntax::{Parser, Tree};

fn load_language(path: &Path) -> Language {
    match Language::from_path(path) {
        Ok(language) => language,
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            process::exit(2);
        }
    }
}

fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            process::exit(2);
        }
    }
}

fn parse_tree(language: &Language, text: &str) -> Tree {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(language) {
        eprintln!("error: {}", e);
        process::exit(2);
    }
    // Without a progress callback or timeout the parse always completes.
    parser
        .parse(text, None)
        .expect("uncancelled parse completes")
}
