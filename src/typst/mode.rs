//! typst::mode
//!
//! Compiler inputs for each way the document is compiled.
//!
//! The document reads `sys.inputs.mode` to decide what to emit:
//! - `pre`: queries and precompilation
//! - `build`: the deployed site, with absolute asset URLs under the site base
//! - `dev`: local preview, with assets from the dev asset server

use crate::core::paths::ProjectPaths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Pre,
    Build { url_base: String },
    Dev { assets_port: u16 },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Pre => "pre",
            Mode::Build { .. } => "build",
            Mode::Dev { .. } => "dev",
        }
    }

    /// `--input` pairs for this mode, followed by [`env_args`].
    pub fn args(&self, paths: &ProjectPaths) -> Vec<String> {
        let mut args = vec!["--input".to_string(), format!("mode={}", self.name())];
        match self {
            Mode::Pre => {}
            Mode::Build { url_base } => {
                args.push("--input".to_string());
                args.push(format!("x-url-base={}", url_base));
            }
            Mode::Dev { assets_port } => {
                args.push("--input".to_string());
                args.push(format!("x-url-base=http://localhost:{}/", assets_port));
            }
        }
        args.extend(env_args(paths));
        args
    }
}

/// Arguments every compilation needs.
pub fn env_args(paths: &ProjectPaths) -> Vec<String> {
    vec![
        "--features=html".to_string(),
        format!("--font-path={}", paths.fonts_dir().display()),
    ]
}
