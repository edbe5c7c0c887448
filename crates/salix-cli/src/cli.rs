use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "salix", bin_name = "salix")]
#[command(about = "Incremental parsing and tree queries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a file and dump its syntax tree
    ///
    /// Exits with status 1 when the tree contains errors.
    Parse {
        /// Compiled grammar artifact
        #[arg(long, value_name = "ARTIFACT")]
        grammar: PathBuf,

        /// File to parse
        file: PathBuf,

        /// Emit a JSON node list instead of an s-expression
        #[arg(long)]
        json: bool,
    },

    /// Run a query over a file and dump matches as JSON lines
    Query {
        /// Compiled grammar artifact
        #[arg(long, value_name = "ARTIFACT")]
        grammar: PathBuf,

        /// Query pattern file
        query: PathBuf,

        /// File to run the query over
        file: PathBuf,

        /// Emit flat captures in position order instead of matches
        #[arg(long)]
        captures: bool,
    },
}
