//! Command-line interface definitions for helpsmith

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI structure for the helpsmith application
#[derive(Parser)]
#[command(name = "helpsmith")]
#[command(version)]
#[command(about = "Legacy WebHelp project editor and build tool", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for helpsmith
#[derive(Subcommand)]
pub enum Commands {
    /// Generate the build artifacts (helpCodes, toc.js, search payload)
    Build {
        /// Project directory containing hmcontent.htm
        #[arg(value_name = "PATH", default_value = ".")]
        project: PathBuf,

        /// Output directory for artifacts, relative to the project
        /// (defaults to the project root)
        #[arg(short, long)]
        output: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Report orphan pages and unused images
    Scan {
        /// Project directory containing hmcontent.htm
        #[arg(value_name = "PATH", default_value = ".")]
        project: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Search the project's topic pages
    Search {
        /// Query text; supports * and ? wildcards
        query: String,

        /// Project directory containing hmcontent.htm
        #[arg(short, long, value_name = "PATH", default_value = ".")]
        project: PathBuf,

        /// Ignore the index cache and rebuild before searching
        #[arg(long)]
        rebuild: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Edit the table of contents
    Toc {
        /// Project directory containing hmcontent.htm
        #[arg(short, long, value_name = "PATH", default_value = ".")]
        project: PathBuf,

        #[command(subcommand)]
        action: TocAction,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Structural operations on the table of contents
#[derive(Subcommand)]
pub enum TocAction {
    /// Print the tree
    List,

    /// Add a section with a freshly created topic page
    Add {
        /// Section title
        title: String,

        /// Topic file name (e.g. printing.htm)
        filename: String,

        /// Parent node id (root level when omitted)
        #[arg(long)]
        parent: Option<String>,

        /// Point at an existing file instead of creating one
        #[arg(long)]
        from_file: bool,
    },

    /// Remove a section and its subtree
    Remove {
        /// Node id
        id: String,

        /// Also delete the backing topic files
        #[arg(long)]
        delete_files: bool,
    },

    /// Reattach a section under a new parent
    Move {
        /// Node id
        id: String,

        /// New parent node id (root level when omitted)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Swap a section with its previous sibling
    Up {
        /// Node id
        id: String,
    },

    /// Swap a section with its next sibling
    Down {
        /// Node id
        id: String,
    },

    /// Make a section the last child of its previous sibling
    Indent {
        /// Node id
        id: String,
    },

    /// Move a section up to follow its current parent
    Outdent {
        /// Node id
        id: String,
    },
}
