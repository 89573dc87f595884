//! typst::runner
//!
//! Runs the typst compiler as a subprocess.
//!
//! # Output
//!
//! - stdout is captured and returned
//! - stderr is forwarded as it arrives, prefixed with the task name when
//!   one is set; known noise from `typst query` is dropped
//!
//! # Errors
//!
//! A non-zero exit is a [`TypstError::Failed`] naming the exit code, the
//! stdin source (if any) and the arguments, so the failing unit can be
//! reproduced by hand.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Substrings of `typst query` warnings that are not actionable.
///
/// `query` does not respect the export target, so HTML-only elements warn
/// about being ignored in paged export.
const SUPPRESSED_QUERY_WARNINGS: &[&str] = &[
    ": elem was ignored during paged export",
    "html-bindings-h.typ:",
];

/// Errors from running the compiler.
#[derive(Debug, Error)]
pub enum TypstError {
    #[error("failed to start '{bin}': {source}")]
    Spawn {
        bin: String,
        source: std::io::Error,
    },

    #[error("failed to talk to typst: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Typst process exited with {}{}\nArgs: typst {}",
        exit_text(.code),
        stdin_block(.stdin),
        .args.join(" ")
    )]
    Failed {
        code: Option<i32>,
        stdin: Option<String>,
        args: Vec<String>,
    },

    #[error("typst printed invalid UTF-8 for 'typst {}'", .args.join(" "))]
    Utf8 { args: Vec<String> },
}

fn exit_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

fn stdin_block(stdin: &Option<String>) -> String {
    match stdin {
        Some(text) => format!("\n```typst\n{}\n```", text),
        None => String::new(),
    }
}

/// Whether typst may colour its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    Always,
    Never,
    #[default]
    Auto,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::Always => "always",
            Color::Never => "never",
            Color::Auto => "auto",
        })
    }
}

/// Anything that runs typst commands.
///
/// Implemented by [`Typst`]; tests substitute a fake.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Run `typst <args>`, feeding `stdin` if given, and return stdout.
    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String, TypstError>;
}

/// The typst executable.
#[derive(Debug, Clone)]
pub struct Typst {
    bin: String,
    cwd: PathBuf,
    color: Color,
    task: Option<String>,
}

impl Typst {
    pub fn new(bin: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            cwd: cwd.into(),
            color: Color::Auto,
            task: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Prefix forwarded stderr lines with `[task]`.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Start a long-running command (e.g. `watch`) with inherited output.
    pub fn spawn(&self, args: &[String]) -> Result<tokio::process::Child, TypstError> {
        log::debug!("spawning {} {}", self.bin, args.join(" "));
        Command::new(&self.bin)
            .arg(format!("--color={}", self.color))
            .args(args)
            .current_dir(&self.cwd)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TypstError::Spawn {
                bin: self.bin.clone(),
                source,
            })
    }

    async fn forward_stderr<R>(&self, mut stderr: R, is_query: bool) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; 8192];
        loop {
            let n = stderr.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            let text = String::from_utf8_lossy(&buf[..n]);
            // Coloured output may split "warning" from its message, so
            // match on the message only.
            if is_query && SUPPRESSED_QUERY_WARNINGS.iter().any(|w| text.contains(w)) {
                continue;
            }
            match &self.task {
                Some(task) => eprintln!("{}", prefix_lines(&text, task)),
                None => eprint!("{}", text),
            }
        }
    }
}

#[async_trait]
impl Compiler for Typst {
    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String, TypstError> {
        log::debug!("running {} {}", self.bin, args.join(" "));

        let mut child = Command::new(&self.bin)
            .arg(format!("--color={}", self.color))
            .args(args)
            .current_dir(&self.cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TypstError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        let child_stdin = child.stdin.take();
        let mut stdout = child.stdout.take().ok_or_else(|| {
            TypstError::Io(std::io::Error::other("stdout was not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            TypstError::Io(std::io::Error::other("stderr was not captured"))
        })?;

        let write = async {
            if let (Some(mut pipe), Some(text)) = (child_stdin, stdin) {
                match pipe.write_all(text.as_bytes()).await {
                    // typst may exit before reading everything; the exit
                    // status reports why.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
                // Dropping the pipe closes it.
            }
            Ok::<_, std::io::Error>(())
        };
        let read = async {
            let mut out = Vec::new();
            stdout.read_to_end(&mut out).await.map(|_| out)
        };
        let is_query = args.first().map(String::as_str) == Some("query");
        let forward = self.forward_stderr(stderr, is_query);

        let (written, output, forwarded) = tokio::join!(write, read, forward);
        written?;
        forwarded?;
        let output = output?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(TypstError::Failed {
                code: status.code(),
                stdin: stdin.map(str::to_string),
                args: args.to_vec(),
            });
        }

        String::from_utf8(output).map_err(|_| TypstError::Utf8 {
            args: args.to_vec(),
        })
    }
}

/// Prefix each line of `text` with a green `[task]`.
pub fn prefix_lines(text: &str, task: &str) -> String {
    text.trim()
        .lines()
        .map(|line| format!("\x1b[32m[{}]\x1b[0m {}", task, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_names_code_stdin_and_args() {
        let err = TypstError::Failed {
            code: Some(1),
            stdin: Some("#panic()".to_string()),
            args: vec!["compile".into(), "-".into(), "out.svg".into()],
        };
        assert_eq!(
            err.to_string(),
            "Typst process exited with code 1\n```typst\n#panic()\n```\nArgs: typst compile - out.svg"
        );

        let err = TypstError::Failed {
            code: None,
            stdin: None,
            args: vec!["query".into()],
        };
        assert_eq!(err.to_string(), "Typst process exited with a signal\nArgs: typst query");
    }

    #[test]
    fn prefixes_every_line() {
        assert_eq!(
            prefix_lines("a\nb\n", "main"),
            "\x1b[32m[main]\x1b[0m a\n\x1b[32m[main]\x1b[0m b"
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let typst = Typst::new("clreq-test-no-such-typst", ".");
        let result = typst.run(&["--version".to_string()], None).await;
        assert!(matches!(result, Err(TypstError::Spawn { .. })));
    }
}
