//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// clreq-tools - Build and check the clreq document
#[derive(Parser, Debug)]
#[command(name = "clreq")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if clreq was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Precompile, then compile the site into dist/
    #[command(
        name = "build",
        long_about = "Precompile, then compile index.typ into dist/index.html.\n\n\
            The page is compiled in build mode: asset URLs are rooted at the \
            deployment base, and build provenance (commit and log links) is \
            passed in from CI variables or the local git checkout.",
        after_help = "\
ENVIRONMENT:
    NETLIFY, DEPLOY_URL      Use $DEPLOY_URL/ as the base on Netlify
    GITHUB_PAGES_BASE        Base URL for GitHub Pages
    GITHUB_ACTIONS, ...      Build provenance from GitHub Actions"
    )]
    Build,

    /// Render examples and the prioritization table into target/cache
    #[command(
        name = "precompile",
        long_about = "Render the artifacts the document embeds.\n\n\
            Every external example in main.typ is compiled to an SVG in \
            target/cache, skipping examples whose source has not changed. \
            The prioritization table is re-rendered when typ/prioritization.typ \
            is newer than the cached table.",
        after_help = "\
EXAMPLES:
    # Render once
    clreq precompile

    # Keep rendering as the document changes
    clreq precompile --watch"
    )]
    Precompile {
        /// Re-run on every change to the document sources
        #[arg(short, long)]
        watch: bool,
    },

    /// Serve assets and recompile the page on every change
    #[command(
        name = "dev",
        long_about = "Run the development session.\n\n\
            Starts precompilation in watch mode, the asset server for public/, \
            and `typst watch` for the page, all at once. Stopping any one of \
            them stops the session.",
        after_help = "\
EXAMPLES:
    # Start developing
    clreq dev

    # Pass extra arguments to typst watch
    clreq dev -- --open"
    )]
    Dev {
        /// Extra arguments for `typst watch`
        #[arg(last = true)]
        typst_args: Vec<String>,
    },

    /// Serve the built site from dist/
    Preview {
        /// Open the page in a browser
        #[arg(long)]
        open: bool,
    },

    /// Print the JSON index of sections, priorities and citations
    #[command(
        name = "index",
        long_about = "Print the JSON index of the document.\n\n\
            Each section carries its bilingual title, level, id, priority and \
            the issues, pull requests and workarounds it cites. Sections \
            without an id are listed as a warning on stderr."
    )]
    Index,

    /// Print the table of contents and priority summary
    Structure {
        /// Deepest heading level shown in the table of contents
        #[arg(long, value_name = "N")]
        max_toc_level: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = StructureFormat::Html)]
        format: StructureFormat,
    },

    /// Check cited issues and pull requests against GitHub
    #[command(
        name = "check-issues",
        long_about = "Check cited issues and pull requests against GitHub.\n\n\
            Verifies that issues are not cited twice without a note, and that \
            the recorded states of issues and pull requests match GitHub. All \
            checks run; the command fails if any of them found a problem.",
        after_help = "\
EXAMPLES:
    # Check uniqueness and freshness
    clreq check-issues

    # Also require every recent issue of the watched repositories to be cited
    clreq check-issues --assert-all-covered

CONFIGURATION:
    The gh CLI is used by default. Set `[github] backend = \"http\"` in the
    global config to use GITHUB_TOKEN or GH_TOKEN instead."
    )]
    CheckIssues {
        /// Also check that recent upstream issues are cited
        #[arg(long)]
        assert_all_covered: bool,
    },

    /// Inject the htmldiff navigation script into dist/index.html
    #[command(name = "patch-htmldiff")]
    PatchHtmldiff,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    clreq completion bash > ~/.local/share/bash-completion/completions/clreq

    # Zsh
    clreq completion zsh > \"${fpath[1]}/_clreq\"

    # Fish
    clreq completion fish > ~/.config/fish/completions/clreq.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Output of the `structure` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    Html,
    Json,
}

/// Supported shells for completion
#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
