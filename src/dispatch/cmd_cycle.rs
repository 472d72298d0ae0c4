// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Command-cycle open hook (spec §4.6): a stanza may name a command to
//! run once, immediately, the first time it is matched, independent of
//! the `COMMAND` message type. The scheduled-close half of a command
//! cycle is a stateful, timer-driven feature with no counterpart here and
//! is not implemented.

use anyhow::Result;
use tracing::info;

use super::commands::run_extcmd_as;
use crate::policy::AccessStanza;

/// Runs a stanza's `cmd_cycle_open` command, if configured, dropping to
/// the stanza's exec uid/gid exactly as a `COMMAND` message would.
pub async fn open(stanza: &AccessStanza) -> Result<()> {
    let Some(cmd) = &stanza.exec.cmd_cycle_open else {
        return Ok(());
    };

    info!(stanza = stanza.stanza_num, cmd = %cmd, "running command-cycle open hook");
    let status = run_extcmd_as(cmd, stanza.exec.cmd_exec_uid, stanza.exec.cmd_exec_gid, None).await?;
    if !status.success() {
        anyhow::bail!("command-cycle open hook exited with {status}");
    }
    Ok(())
}
