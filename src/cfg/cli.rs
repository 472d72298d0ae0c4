// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}

/// Minimal command-line surface, parsed by hand from `std::env::args`.
///
/// Mirrors the original daemon's `--test`/`--foreground` flags (spec §4.6,
/// P8): `test` short-circuits command execution and firewall manipulation,
/// `foreground` keeps the process attached to its controlling terminal
/// instead of daemonizing.
#[derive(Debug, Clone)]
pub struct Args {
    pub config: PathBuf,
    pub test: bool,
    pub foreground: bool,
}

impl Args {
    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut config: Option<PathBuf> = None;
        let mut test = false;
        let mut foreground = false;

        let mut it = args.into_iter();
        // skip argv[0]
        it.next();

        while let Some(arg) = it.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    let v = it.next().context("--config requires a path argument")?;
                    config = Some(PathBuf::from(v));
                },
                "--test" => test = true,
                "--foreground" => foreground = true,
                other => bail!("unrecognized argument: {other}"),
            }
        }

        let config = config.context("--config <path> is required")?;
        Ok(Args {
            config,
            test,
            foreground,
        })
    }
}
