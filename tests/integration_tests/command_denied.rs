// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use spa_authd::policy::PolicySet;

use crate::integration_tests::common::{
    RunningServer, command_stanza_yaml, load_policy, now_secs, plaintext_message, rijndael_envelope, spa_config,
    write_policy_file,
};

/// A `COMMAND` message against a stanza with `enable_cmd_exec: false` is
/// accepted by validation but denied at dispatch; no command ever runs.
#[tokio::test]
async fn command_message_denied_without_enable_cmd_exec() -> Result<()> {
    let sym_key = b"topsecretkey12345";
    let hmac_key = b"hmacsecret";

    let marker_path = std::env::temp_dir().join(format!("spa-authd-it-denied-{}.touch", std::process::id()));
    let _ = std::fs::remove_file(&marker_path);

    let policy_path = write_policy_file(&[command_stanza_yaml(
        std::str::from_utf8(sym_key).unwrap(),
        std::str::from_utf8(hmac_key).unwrap(),
        "alice",
        false,
    )]);
    let policy_set: PolicySet = load_policy(&policy_path, false);

    let server = RunningServer::start(policy_set, spa_config(false), false, 1).await;

    let body = format!("1.2.3.4,touch {}", marker_path.display());
    let plaintext = plaintext_message("alice", "COMMAND", &body, now_secs());
    let payload = rijndael_envelope(sym_key, hmac_key, plaintext.as_bytes());
    server.send(&payload).await;

    server.join().await?;
    std::fs::remove_file(&policy_path).ok();

    assert!(!marker_path.exists(), "command execution must be denied when the stanza disables it");
    Ok(())
}
