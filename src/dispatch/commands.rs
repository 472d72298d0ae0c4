// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! External command execution for `COMMAND`-type messages (spec §4.6).
//!
//! Out of the core's test surface per spec §1 ("external command execution
//! ... treated as an opaque collaborator"), but implemented here at real
//! fidelity so the crate is a runnable daemon rather than a stub.

use std::{process::Stdio, time::Duration};

use anyhow::{Result, anyhow};
use tokio::{process::Command, time::timeout};

/// Runs `cmd` through `/bin/sh -c`, waiting up to `cmd_timeout` (`None` on
/// the privileged, setuid-equivalent path, matching the original's
/// `NO_TIMEOUT`).
pub async fn run_extcmd(cmd: &str, cmd_timeout: Option<Duration>) -> Result<std::process::ExitStatus> {
    run(cmd, None, None, cmd_timeout).await
}

/// Same as [`run_extcmd`] but drops to `uid`/`gid` before exec, matching
/// `acc->cmd_exec_uid`/`cmd_exec_gid`.
pub async fn run_extcmd_as(cmd: &str, uid: u32, gid: u32, cmd_timeout: Option<Duration>) -> Result<std::process::ExitStatus> {
    run(cmd, Some(uid), Some(gid), cmd_timeout).await
}

async fn run(
    cmd: &str,
    uid: Option<u32>,
    gid: Option<u32>,
    cmd_timeout: Option<Duration>,
) -> Result<std::process::ExitStatus> {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg(cmd).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    if let Some(gid) = gid {
        command.gid(gid);
    }
    if let Some(uid) = uid {
        command.uid(uid);
    }

    let mut child = command.spawn().map_err(|e| anyhow!("failed to spawn command: {e}"))?;

    let wait = child.wait();
    let status = match cmd_timeout {
        Some(d) => timeout(d, wait)
            .await
            .map_err(|_| anyhow!("command timed out after {d:?}"))??,
        None => wait.await?,
    };

    Ok(status)
}
