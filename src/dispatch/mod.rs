// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Request Dispatcher (C6): routes one validated request to command
//! execution, the command-cycle open hook, or the firewall actuator.

pub mod cmd_cycle;
pub mod commands;
pub mod firewall;

use std::time::Duration;

use tracing::warn;

use crate::{cfg::config::SpaConfig, message::DecodedMessage, policy::AccessStanza};
pub use firewall::{AccessGrant, LoggingFirewall};

/// Ceiling on the non-privileged command-execution path (spec §5): bounds
/// how long an external command can stall the single-threaded pipeline.
const CMD_EXEC_TIMEOUT: Duration = Duration::from_secs(5);

/// What C6 did with a validated request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A command-cycle open hook ran; no other dispatch happened.
    CommandCycleOpened,
    /// The stanza does not permit command execution.
    CommandDenied,
    /// A `COMMAND` message ran to completion with this exit code.
    CommandExecuted { exit_code: Option<i32> },
    /// An access message was granted with this timeout.
    AccessGranted { timeout_secs: u32 },
    /// `test` mode: neither firewall nor command side effects ran.
    TestModeSkipped,
}

/// Routes a message that has already cleared C5, against the stanza that
/// accepted it.
pub async fn dispatch(
    stanza: &AccessStanza,
    decoded: &DecodedMessage,
    spa_cfg: &SpaConfig,
    fw: &LoggingFirewall,
    test_mode: bool,
) -> DispatchOutcome {
    if test_mode {
        warn!(stanza = stanza.stanza_num, "test mode: skipping command execution and firewall changes");
        return DispatchOutcome::TestModeSkipped;
    }

    if stanza.exec.cmd_cycle_open.is_some() {
        if let Err(e) = cmd_cycle::open(stanza).await {
            warn!(stanza = stanza.stanza_num, error = %e, "command-cycle open hook failed");
        }
        return DispatchOutcome::CommandCycleOpened;
    }

    if decoded.message_type.is_command() {
        return dispatch_command(stanza, decoded, spa_cfg).await;
    }

    dispatch_access(stanza, decoded, spa_cfg, fw).await
}

async fn dispatch_command(stanza: &AccessStanza, decoded: &DecodedMessage, spa_cfg: &SpaConfig) -> DispatchOutcome {
    if !stanza.exec.enable_cmd_exec {
        warn!(stanza = stanza.stanza_num, "SPA Command messages are not allowed");
        return DispatchOutcome::CommandDenied;
    }

    let cmd = build_command_string(stanza, spa_cfg, &decoded.message_body);

    let result = if stanza.exec.cmd_exec_uid != 0 {
        commands::run_extcmd_as(
            &cmd,
            stanza.exec.cmd_exec_uid,
            stanza.exec.cmd_exec_gid,
            Some(CMD_EXEC_TIMEOUT),
        )
        .await
    } else {
        commands::run_extcmd(&cmd, Some(CMD_EXEC_TIMEOUT)).await
    };

    match result {
        Ok(status) if status.success() => DispatchOutcome::CommandExecuted {
            exit_code: status.code(),
        },
        Ok(status) => {
            warn!(stanza = stanza.stanza_num, status = %status, "SPA command exited abnormally");
            DispatchOutcome::CommandExecuted {
                exit_code: status.code(),
            }
        },
        Err(e) => {
            warn!(stanza = stanza.stanza_num, error = %e, "SPA command failed to run");
            DispatchOutcome::CommandExecuted { exit_code: None }
        },
    }
}

/// Prepends the configured sudo executable when the stanza asks for it,
/// omitting `-u`/`-g` when the corresponding exec identity is root/empty.
fn build_command_string(stanza: &AccessStanza, spa_cfg: &SpaConfig, body: &str) -> String {
    if !stanza.exec.enable_cmd_sudo_exec || spa_cfg.sudo_exe.is_empty() {
        return body.to_string();
    }

    let mut prefix = spa_cfg.sudo_exe.clone();
    if !stanza.exec.cmd_exec_user.is_empty() && stanza.exec.cmd_exec_user != "root" {
        prefix.push_str(&format!(" -u {}", stanza.exec.cmd_exec_user));
    }
    if !stanza.exec.cmd_exec_group.is_empty() && stanza.exec.cmd_exec_group != "root" {
        prefix.push_str(&format!(" -g {}", stanza.exec.cmd_exec_group));
    }
    format!("{prefix} {body}")
}

async fn dispatch_access(
    stanza: &AccessStanza,
    decoded: &DecodedMessage,
    spa_cfg: &SpaConfig,
    fw: &LoggingFirewall,
) -> DispatchOutcome {
    let timeout_secs = if decoded.client_timeout > 0 {
        decoded.client_timeout
    } else {
        stanza.fw_access_timeout.unwrap_or(spa_cfg.default_fw_access_timeout)
    };

    let grant = AccessGrant::from_decoded(decoded, timeout_secs);
    fw.process_spa_request(&grant).await;
    DispatchOutcome::AccessGranted { timeout_secs }
}
