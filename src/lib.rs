#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::field_reassign_with_default,
    clippy::float_cmp,
    clippy::items_after_statements,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::redundant_closure_for_method_calls,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_literal_bound,
    clippy::unnecessary_map_or,
    clippy::unused_self,
    clippy::unnecessary_wraps
)]

use clap::Subcommand;

pub mod channels;
pub mod commands;
pub mod config;
pub mod security;
pub mod util;

pub use commands::{CommandEngine, Origin, Status};
pub use config::Config;

/// Top-level CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommands {
    /// Read command lines from stdin until EOF, `/quit`, or `stop`
    Console,
    /// Run one line and exit with its status code
    Exec {
        /// The line to run. Non-console origins need the tag or mention prefix.
        line: String,

        /// Origin to run as: console, private or guild
        #[arg(long, default_value = "console")]
        origin: Origin,

        /// Author id (default: configured owner)
        #[arg(long)]
        user: Option<u64>,

        /// Guild id, for guild origin
        #[arg(long)]
        guild: Option<u64>,
    },
    /// Print the registered command tree
    Commands,
}
