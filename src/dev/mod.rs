//! dev
//!
//! Long-running development workflows.
//!
//! # Modules
//!
//! - [`watch`] - Precompilation on file changes
//! - [`server`] - Asset and preview servers
//!
//! # Design
//!
//! `dev` runs three tasks side by side: precompile-watch, the asset
//! server, and `typst watch`. They are raced with `tokio::select!`; the
//! first one to finish ends the session and the others are dropped, which
//! kills the typst child process.

pub mod server;
pub mod watch;

use std::sync::Arc;

use thiserror::Error;

use crate::core::paths::ProjectPaths;
use crate::typst::{Color, Mode, Precompiler, Typst, TypstError};
use crate::ui::output::{self, Verbosity};

pub use server::ServerError;
pub use watch::WatchError;

/// Errors from a development session.
#[derive(Debug, Error)]
pub enum DevError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Typst(#[from] TypstError),

    #[error("typst watch exited with {0}")]
    TypstExited(std::process::ExitStatus),

    #[error("{task} stopped unexpectedly")]
    Stopped { task: &'static str },
}

/// Settings for [`run_dev`].
#[derive(Debug, Clone)]
pub struct DevOptions {
    pub typst: String,
    pub assets_port: u16,
    /// Extra arguments for `typst watch`.
    pub typst_args: Vec<String>,
}

/// `typst watch` arguments for the dev page.
pub fn typst_watch_args(paths: &ProjectPaths, options: &DevOptions) -> Vec<String> {
    let mut args = vec![
        "watch".to_string(),
        "index.typ".to_string(),
        "dist/index.html".to_string(),
    ];
    args.extend(
        Mode::Dev {
            assets_port: options.assets_port,
        }
        .args(paths),
    );
    args.extend(options.typst_args.iter().cloned());
    args
}

/// Run the development session until one of its tasks stops.
pub async fn run_dev(
    paths: &ProjectPaths,
    options: &DevOptions,
    verbosity: Verbosity,
) -> Result<(), DevError> {
    let precompiler = Precompiler::new(
        Arc::new(
            Typst::new(&options.typst, paths.root())
                .with_color(Color::Always)
                .with_task("precompile"),
        ),
        paths.clone(),
    );
    let listener = server::bind(options.assets_port).await?;
    output::task(
        "assets",
        format!("serving public/ at http://localhost:{}/", options.assets_port),
        verbosity,
    );

    std::fs::create_dir_all(paths.dist_dir()).map_err(TypstError::Io)?;
    let mut typst = Typst::new(&options.typst, paths.root())
        .with_color(Color::Always)
        .spawn(&typst_watch_args(paths, options))?;

    tokio::select! {
        result = watch::precompile_watch(&precompiler, paths.root(), verbosity) => {
            result?;
            Err(DevError::Stopped { task: "precompile" })
        }
        result = server::serve(listener, server::asset_router(&paths.public_dir())) => {
            result?;
            Err(DevError::Stopped { task: "assets" })
        }
        status = typst.wait() => {
            let status = status.map_err(TypstError::Io)?;
            if status.success() {
                Ok(())
            } else {
                Err(DevError::TypstExited(status))
            }
        }
    }
}

/// Serve `dist/` under `base` on `port`, optionally opening a browser.
pub async fn run_preview(
    paths: &ProjectPaths,
    port: u16,
    base: &str,
    open_browser: bool,
    verbosity: Verbosity,
) -> Result<(), DevError> {
    let listener = server::bind(port).await?;
    let url = format!("http://localhost:{}{}", port, server::base_path(base));
    output::print(format!("Preview at {}", url), verbosity);

    if open_browser {
        if let Err(e) = open::that(&url) {
            output::warn(format!("could not open a browser: {}", e), verbosity);
        }
    }

    server::serve(listener, server::preview_router(&paths.dist_dir(), base)).await?;
    Ok(())
}
