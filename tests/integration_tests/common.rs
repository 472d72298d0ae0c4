// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::Mac;
use spa_authd::{
    cfg::config::{Config, ReplayConfig, ServerConfig, SpaConfig},
    orchestrator::Orchestrator,
    policy::{self, PolicySet},
    replay::ReplayStore,
    server,
};
use tokio::net::UdpSocket;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns a per-process, per-call-unique path under the system temp
/// directory, so concurrently running scenarios never share state.
pub fn temp_path(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("spa-authd-it-{prefix}-{}-{n}.tmp", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn spa_config(legacy_allowed: bool) -> SpaConfig {
    let yaml = format!(
        r#"
EnableSpaOverHttp: Y
DisableSdpMode: Y
EnableDigestPersistence: Y
EnableSpaPacketAging: N
MaxSpaPacketAge: 120
AllowLegacyAccessRequests: {}
EnableFirewdForwarding: N
EnableIptForwarding: Y
EnableFirewdLocalNat: N
EnableIptLocalNat: N
SudoExe: ""
DefaultFwAccessTimeout: 30
"#,
        if legacy_allowed { "Y" } else { "N" }
    );
    serde_yaml::from_str(&yaml).expect("static test fixture must parse")
}

/// Writes a minimal access-policy YAML file with one stanza per entry in
/// `stanza_yamls` and returns its path.
pub fn write_policy_file(stanza_yamls: &[String]) -> String {
    let path = temp_path("policy");
    let body = format!("stanzas:\n{}", stanza_yamls.join("\n"));
    std::fs::write(&path, body).expect("failed to write test policy file");
    path
}

/// One stanza entry, keyed to a symmetric key/HMAC pair, an open port, and
/// a required username, matching [`rijndael_envelope`]'s defaults. Grants
/// via the legacy port/proto ACL, so the caller's config must set
/// `AllowLegacyAccessRequests: Y`.
pub fn classic_stanza_yaml(sym_key: &str, hmac_key: &str, username: &str, port: u16) -> String {
    format!(
        r#"  - sym_key: "{sym_key}"
    hmac_key: "{hmac_key}"
    source_list: ["0.0.0.0/0"]
    require_username: "{username}"
    open_ports: ["tcp/{port}"]
"#
    )
}

/// One stanza entry granting via the `SERVICE_ACCESS` service-id ACL, so
/// it is authorized under the default (non-legacy) message-type policy.
pub fn service_stanza_yaml(sym_key: &str, hmac_key: &str, username: &str, service: &str) -> String {
    format!(
        r#"  - sym_key: "{sym_key}"
    hmac_key: "{hmac_key}"
    source_list: ["0.0.0.0/0"]
    require_username: "{username}"
    service_ids: ["{service}"]
"#
    )
}

/// A stanza entry with an unreasonably short `access_expire_time` so the
/// first evaluation marks it expired.
pub fn expired_stanza_yaml(sym_key: &str, hmac_key: &str, username: &str, service: &str) -> String {
    format!(
        r#"  - sym_key: "{sym_key}"
    hmac_key: "{hmac_key}"
    source_list: ["0.0.0.0/0"]
    require_username: "{username}"
    service_ids: ["{service}"]
    access_expire_time: 1
"#
    )
}

pub fn command_stanza_yaml(sym_key: &str, hmac_key: &str, username: &str, enable_cmd_exec: bool) -> String {
    format!(
        r#"  - sym_key: "{sym_key}"
    hmac_key: "{hmac_key}"
    source_list: ["0.0.0.0/0"]
    require_username: "{username}"
    exec:
      enable_cmd_exec: {}
"#,
        if enable_cmd_exec { "true" } else { "false" }
    )
}

/// Builds the `IV || ciphertext || HMAC` envelope (AES-128-CBC, PKCS7,
/// HMAC-SHA256) the same way the Rijndael decryption path expects, then
/// base64-url-safe encodes it.
pub fn rijndael_envelope(sym_key: &[u8], hmac_key: &[u8], plaintext: &[u8]) -> String {
    let iv = [9u8; 16];
    let mut buf = plaintext.to_vec();
    buf.resize(buf.len() + 16, 0);
    let pt_len = plaintext.len();

    let mut key = sym_key.to_vec();
    key.resize(16, 0);
    let encryptor = cbc::Encryptor::<aes::Aes128>::new(key.as_slice().into(), &iv.into());
    let ciphertext = encryptor.encrypt_padded_mut::<Pkcs7>(&mut buf, pt_len).unwrap().to_vec();

    let mut signed = Vec::new();
    signed.extend_from_slice(&iv);
    signed.extend_from_slice(&ciphertext);

    let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(hmac_key).unwrap();
    mac.update(&signed);
    let tag = mac.finalize().into_bytes();

    let mut out = signed;
    out.extend_from_slice(&tag);
    URL_SAFE_NO_PAD.encode(out)
}

/// Standard SPA plaintext layout: `version:timestamp:username:type:body:::timeout`.
pub fn plaintext_message(username: &str, message_type: &str, body: &str, timestamp: i64) -> String {
    format!("1.0:{timestamp}:{username}:{message_type}:{body}:::0")
}

pub struct RunningServer {
    pub addr: SocketAddrV4,
    pub replay_path: String,
    handle: tokio::task::JoinHandle<Result<()>>,
}

impl RunningServer {
    /// Binds a fresh loopback port, starts [`server::run`] in the
    /// background with `packet_ctr_limit` set, and waits for it to bind
    /// before returning so the caller can send immediately.
    pub async fn start(policy_set: PolicySet, spa: SpaConfig, test_mode: bool, packet_ctr_limit: u64) -> Self {
        let probe = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = match probe.local_addr().unwrap() {
            std::net::SocketAddr::V4(v4) => v4,
            _ => unreachable!(),
        };
        drop(probe);

        let replay_path = temp_path("replay");
        let replay = ReplayStore::open(&replay_path).unwrap();

        let config = Config {
            server: ServerConfig {
                bind_address: *addr.ip(),
                udp_serv_port: addr.port(),
                select_timeout_usec: 500_000,
                rules_check_threshold: 0,
                packet_ctr_limit,
            },
            spa,
            replay: ReplayConfig {
                digest_db_file: replay_path.clone(),
            },
            access_policy_path: String::new(),
        };

        let orchestrator = Arc::new(Orchestrator::new(config, Arc::new(policy_set), replay, test_mode));
        let handle = tokio::spawn(server::run(orchestrator, addr, 0, packet_ctr_limit));

        tokio::time::sleep(Duration::from_millis(50)).await;

        RunningServer { addr, replay_path, handle }
    }

    pub async fn send(&self, payload: &str) {
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(payload.as_bytes(), self.addr).await.unwrap();
    }

    /// Waits for the listener to stop after reaching its packet counter
    /// limit, i.e. after processing exactly the packets the caller sent.
    pub async fn join(self) -> Result<()> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .context("server did not stop within its packet counter limit")??;
        std::fs::remove_file(&self.replay_path).ok();
        Ok(())
    }
}

pub fn load_policy(path: &str, identity_mode: bool) -> PolicySet {
    policy::loader::load_policy(path, identity_mode).expect("test policy fixture must load")
}
