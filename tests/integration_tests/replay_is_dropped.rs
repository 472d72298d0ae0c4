// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::Result;
use spa_authd::policy::PolicySet;

use crate::integration_tests::common::{
    RunningServer, command_stanza_yaml, load_policy, now_secs, plaintext_message, rijndael_envelope, spa_config,
    write_policy_file,
};

/// Sending the same packet twice must only run the command once: the
/// replay cache rejects the second presentation before it ever reaches
/// dispatch.
#[tokio::test]
async fn second_presentation_of_the_same_packet_is_dropped() -> Result<()> {
    let sym_key = b"topsecretkey12345";
    let hmac_key = b"hmacsecret";

    let marker_path = std::env::temp_dir().join(format!("spa-authd-it-replay-{}.touch", std::process::id()));
    let counter_path = std::env::temp_dir().join(format!("spa-authd-it-replay-ctr-{}.txt", std::process::id()));
    let _ = std::fs::remove_file(&marker_path);
    let _ = std::fs::remove_file(&counter_path);

    let policy_path = write_policy_file(&[command_stanza_yaml(
        std::str::from_utf8(sym_key).unwrap(),
        std::str::from_utf8(hmac_key).unwrap(),
        "alice",
        true,
    )]);
    let policy_set: PolicySet = load_policy(&policy_path, false);

    // A command that appends to a file rather than merely creating it, so
    // a second execution is distinguishable from the first.
    let body = format!("1.2.3.4,echo x >> {}", counter_path.display());
    let plaintext = plaintext_message("alice", "COMMAND", &body, now_secs());
    let payload = rijndael_envelope(sym_key, hmac_key, plaintext.as_bytes());

    // packet_ctr_limit=2: the server must still observe and drop the
    // second datagram as a replay before stopping.
    let server = RunningServer::start(policy_set, spa_config(false), false, 2).await;
    server.send(&payload).await;
    server.send(&payload).await;
    server.join().await?;
    std::fs::remove_file(&policy_path).ok();

    // Give the first command a moment to finish writing before reading.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let contents = std::fs::read_to_string(&counter_path).unwrap_or_default();
    let lines = contents.lines().count();
    std::fs::remove_file(&counter_path).ok();

    assert_eq!(lines, 1, "the replayed packet must not run the command a second time");
    Ok(())
}
