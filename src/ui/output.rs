//! ui::output
//!
//! Terminal output for `clreq` commands.
//!
//! # Streams
//!
//! `index` and `structure` print documents (JSON, HTML) on stdout, so
//! stdout carries only results and reports. Warnings, progress and the
//! lines of concurrent `dev` tasks go to stderr. `--quiet` silences
//! everything except results and errors.
//!
//! Debug messages are also forwarded to the `log` facade, so
//! `RUST_LOG=debug` shows them next to the tracing of inner modules.

use std::fmt::Display;

/// How much a command reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// `--quiet`: results and errors only.
    Quiet,
    Normal,
    /// `--debug`: also report resolved paths, backends and counts.
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// A report line on stdout, such as a reconciliation summary.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        println!("{}", message);
    }
}

/// The document a command produces. Printed even with `--quiet`.
pub fn result(message: impl Display) {
    println!("{}", message);
}

pub fn debug(message: impl Display, verbosity: Verbosity) {
    log::debug!("{}", message);
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Document and config problems that do not stop the command.
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        eprintln!("warning: {}", message);
    }
}

pub fn success(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        println!("✅ {}", message);
    }
}

/// A line from one of the tasks `dev` runs side by side.
pub fn task(name: &str, message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        eprintln!("{}", task_line(name, message));
    }
}

/// `[name] message`, with the task name in blue.
pub fn task_line(name: &str, message: impl Display) -> String {
    format!("\x1b[34m[{}]\x1b[0m {}", name, message)
}

/// One item per line, each behind `prefix`.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_debug() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn task_lines_carry_the_task_name() {
        assert_eq!(
            task_line("precompile", "Rendered 2 examples"),
            "\x1b[34m[precompile]\x1b[0m Rendered 2 examples"
        );
    }

    #[test]
    fn findings_are_listed_one_per_line() {
        let findings = ["orphan <priority>", "x/y#1 cited twice"];
        assert_eq!(
            format_list(&findings, "  - "),
            "  - orphan <priority>\n  - x/y#1 cited twice"
        );
        assert_eq!(format_list::<&str>(&[], "- "), "");
    }
}
