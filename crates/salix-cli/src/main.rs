mod cli;
mod commands;

use clap::Parser;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Parse {
            grammar,
            file,
            json,
        } => commands::parse::run(&grammar, &file, json),
        Command::Query {
            grammar,
            query,
            file,
            captures,
        } => commands::query::run(&grammar, &query, &file, captures),
    }
}
