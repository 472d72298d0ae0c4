// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use spa_authd::policy::PolicySet;

use crate::integration_tests::common::{
    RunningServer, classic_stanza_yaml, load_policy, now_secs, plaintext_message, rijndael_envelope, service_stanza_yaml,
    spa_config, write_policy_file,
};

/// A `SERVICE_ACCESS` message against a `service_ids` stanza is granted
/// without ever touching the command-execution path. Unlike the
/// `COMMAND` scenarios, a grant here only reaches the logging firewall
/// stub, so this test's assertion is that the pipeline runs the request
/// to completion and stops cleanly rather than dropping or hanging it.
#[tokio::test]
async fn service_access_message_is_granted() -> Result<()> {
    let sym_key = b"topsecretkey12345";
    let hmac_key = b"hmacsecret";

    let policy_path = write_policy_file(&[service_stanza_yaml(
        std::str::from_utf8(sym_key).unwrap(),
        std::str::from_utf8(hmac_key).unwrap(),
        "alice",
        "ssh",
    )]);
    let policy_set: PolicySet = load_policy(&policy_path, false);

    let server = RunningServer::start(policy_set, spa_config(false), false, 1).await;

    let plaintext = plaintext_message("alice", "SERVICE_ACCESS", "1.2.3.4,ssh", now_secs());
    let payload = rijndael_envelope(sym_key, hmac_key, plaintext.as_bytes());
    server.send(&payload).await;

    server.join().await?;
    std::fs::remove_file(&policy_path).ok();
    Ok(())
}

/// A legacy `CLIENT_TIMEOUT_ACCESS` message against a port/proto ACL
/// stanza is only admitted when `AllowLegacyAccessRequests` is enabled.
#[tokio::test]
async fn legacy_port_proto_message_is_granted_when_allowed() -> Result<()> {
    let sym_key = b"topsecretkey12345";
    let hmac_key = b"hmacsecret";

    let policy_path = write_policy_file(&[classic_stanza_yaml(
        std::str::from_utf8(sym_key).unwrap(),
        std::str::from_utf8(hmac_key).unwrap(),
        "alice",
        22,
    )]);
    let policy_set: PolicySet = load_policy(&policy_path, false);

    let server = RunningServer::start(policy_set, spa_config(true), false, 1).await;

    let plaintext = plaintext_message("alice", "CLIENT_TIMEOUT_ACCESS", "1.2.3.4,tcp/22", now_secs());
    let payload = rijndael_envelope(sym_key, hmac_key, plaintext.as_bytes());
    server.send(&payload).await;

    server.join().await?;
    std::fs::remove_file(&policy_path).ok();
    Ok(())
}
