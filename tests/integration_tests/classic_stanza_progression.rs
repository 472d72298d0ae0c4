// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use spa_authd::policy::PolicySet;

use crate::integration_tests::common::{
    RunningServer, command_stanza_yaml, load_policy, now_secs, plaintext_message, rijndael_envelope, spa_config,
    write_policy_file,
};

/// Three stanzas share a source range but carry distinct keys. Only the
/// third decrypts the packet; the first two fail their decryption attempt
/// and the orchestrator keeps searching rather than giving up.
#[tokio::test]
async fn orchestrator_keeps_searching_past_stanzas_with_the_wrong_key() -> Result<()> {
    let wrong_key_a = b"wrongkeyaaaaaaaaa";
    let wrong_key_b = b"wrongkeybbbbbbbbb";
    let correct_key = b"thecorrectkey123";
    let wrong_hmac_a = b"wronghmacaaaaaaaa";
    let wrong_hmac_b = b"wronghmacbbbbbbbb";
    let correct_hmac = b"hmacsecret";

    let marker_path = std::env::temp_dir().join(format!("spa-authd-it-progress-{}.touch", std::process::id()));
    let _ = std::fs::remove_file(&marker_path);

    // Distinct HMAC keys too: a wrong HMAC fails verification before
    // decryption is even attempted, which is deterministic, whereas a
    // wrong sym_key alone only fails a PKCS7 padding check on garbage
    // plaintext.
    let policy_path = write_policy_file(&[
        command_stanza_yaml(std::str::from_utf8(wrong_key_a).unwrap(), std::str::from_utf8(wrong_hmac_a).unwrap(), "alice", true),
        command_stanza_yaml(std::str::from_utf8(wrong_key_b).unwrap(), std::str::from_utf8(wrong_hmac_b).unwrap(), "alice", true),
        command_stanza_yaml(std::str::from_utf8(correct_key).unwrap(), std::str::from_utf8(correct_hmac).unwrap(), "alice", true),
    ]);
    let policy_set: PolicySet = load_policy(&policy_path, false);

    let server = RunningServer::start(policy_set, spa_config(false), false, 1).await;

    let body = format!("1.2.3.4,touch {}", marker_path.display());
    let plaintext = plaintext_message("alice", "COMMAND", &body, now_secs());
    // Encrypted and HMAC-signed with the third stanza's keys only; the
    // first two stanzas' HMAC verification must fail and keep searching.
    let payload = rijndael_envelope(correct_key, correct_hmac, plaintext.as_bytes());
    server.send(&payload).await;

    server.join().await?;
    std::fs::remove_file(&policy_path).ok();

    assert!(marker_path.exists(), "the matching third stanza should still have authorized the request");
    std::fs::remove_file(&marker_path).ok();
    Ok(())
}
