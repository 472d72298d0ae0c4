// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use spa_authd::policy::PolicySet;

use crate::integration_tests::common::{
    RunningServer, load_policy, now_secs, plaintext_message, rijndael_envelope, spa_config, write_policy_file,
};

/// A stanza whose `access_expire_time` is already in the past is skipped
/// outright, before any decryption is attempted — observed here through a
/// `COMMAND` stanza that would otherwise leave a marker file behind.
#[tokio::test]
async fn expired_stanza_never_dispatches() -> Result<()> {
    let sym_key = b"topsecretkey12345";
    let hmac_key = b"hmacsecret";

    let marker_path = std::env::temp_dir().join(format!("spa-authd-it-expired-{}.touch", std::process::id()));
    let _ = std::fs::remove_file(&marker_path);

    let stanza_yaml = format!(
        r#"  - sym_key: "{}"
    hmac_key: "{}"
    source_list: ["0.0.0.0/0"]
    require_username: "alice"
    access_expire_time: 1
    exec:
      enable_cmd_exec: true
"#,
        std::str::from_utf8(sym_key).unwrap(),
        std::str::from_utf8(hmac_key).unwrap(),
    );
    let policy_path = write_policy_file(&[stanza_yaml]);
    let policy_set: PolicySet = load_policy(&policy_path, false);

    let server = RunningServer::start(policy_set, spa_config(false), false, 1).await;

    let body = format!("1.2.3.4,touch {}", marker_path.display());
    let plaintext = plaintext_message("alice", "COMMAND", &body, now_secs());
    let payload = rijndael_envelope(sym_key, hmac_key, plaintext.as_bytes());
    server.send(&payload).await;

    server.join().await?;
    std::fs::remove_file(&policy_path).ok();

    assert!(!marker_path.exists(), "an expired stanza must never reach dispatch");
    Ok(())
}
