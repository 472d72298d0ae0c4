// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use spa_authd::policy::PolicySet;

use crate::integration_tests::common::{
    RunningServer, command_stanza_yaml, load_policy, now_secs, plaintext_message, rijndael_envelope, spa_config,
    write_policy_file,
};

/// The same envelope that works as a raw UDP datagram also works wrapped
/// in an HTTP GET request with the fwknop user agent, when
/// `EnableSpaOverHttp` is set.
#[tokio::test]
async fn http_wrapped_request_still_dispatches() -> Result<()> {
    let sym_key = b"topsecretkey12345";
    let hmac_key = b"hmacsecret";

    let marker_path = std::env::temp_dir().join(format!("spa-authd-it-http-{}.touch", std::process::id()));
    let _ = std::fs::remove_file(&marker_path);

    let policy_path = write_policy_file(&[command_stanza_yaml(
        std::str::from_utf8(sym_key).unwrap(),
        std::str::from_utf8(hmac_key).unwrap(),
        "alice",
        true,
    )]);
    let policy_set: PolicySet = load_policy(&policy_path, false);

    let server = RunningServer::start(policy_set, spa_config(false), false, 1).await;

    let body = format!("1.2.3.4,touch {}", marker_path.display());
    let plaintext = plaintext_message("alice", "COMMAND", &body, now_secs());
    let b64_payload = rijndael_envelope(sym_key, hmac_key, plaintext.as_bytes());
    let http_request = format!("GET /{b64_payload} HTTP/1.1\r\nUser-Agent: Fwknop/2.6.10\r\n\r\n");
    server.send(&http_request).await;

    server.join().await?;
    std::fs::remove_file(&policy_path).ok();

    assert!(marker_path.exists(), "the HTTP-tunneled request should dispatch the same as a raw datagram");
    std::fs::remove_file(&marker_path).ok();
    Ok(())
}
