// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, net::Ipv4Addr, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::YesNo;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// UDP listener parameters.
    pub server: ServerConfig,
    /// Behavior toggles for the SPA ingestion pipeline.
    pub spa: SpaConfig,
    /// Replay cache persistence.
    pub replay: ReplayConfig,
    /// Path to the access policy stanza file.
    pub access_policy_path: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Socket and outer-loop tunables, mirroring the original daemon's
/// `UDPSERV_*`/`RULES_CHECK_THRESHOLD` config keys.
pub struct ServerConfig {
    #[serde(rename = "BindAddress", default = "default_bind_address")]
    /// Local interface to bind the UDP listener to.
    pub bind_address: Ipv4Addr,

    #[serde(rename = "UdpServPort")]
    /// Port the UDP listener binds to.
    pub udp_serv_port: u16,

    #[serde(rename = "SelectTimeoutUsec")]
    /// Poll interval in microseconds between firewall/cmd-cycle ticks.
    pub select_timeout_usec: u64,

    #[serde(rename = "RulesCheckThreshold", default)]
    /// Number of poll iterations between full firewall rule sweeps; 0
    /// disables periodic sweeping.
    pub rules_check_threshold: u32,

    #[serde(rename = "PacketCounterLimit", default)]
    /// Optional cap on packets processed before the listener exits; 0 means
    /// unbounded.
    pub packet_ctr_limit: u64,
}

fn default_bind_address() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Wire-format `Y`/`N` toggles, parsed once into typed booleans here; the
/// pipeline never re-parses a string after this point.
pub struct SpaConfig {
    #[serde(rename = "EnableSpaOverHttp")]
    enable_spa_over_http: YesNo,

    #[serde(rename = "DisableSdpMode")]
    disable_sdp_mode: YesNo,

    #[serde(rename = "EnableDigestPersistence")]
    enable_digest_persistence: YesNo,

    #[serde(rename = "EnableSpaPacketAging")]
    enable_spa_packet_aging: YesNo,

    #[serde(rename = "MaxSpaPacketAge")]
    /// Maximum age, in seconds, a timestamped packet may carry before it is
    /// rejected as stale.
    pub max_spa_packet_age: u32,

    #[serde(rename = "AllowLegacyAccessRequests")]
    allow_legacy_access_requests: YesNo,

    #[serde(rename = "EnableFirewdForwarding")]
    enable_firewd_forwarding: YesNo,

    #[serde(rename = "EnableIptForwarding")]
    enable_ipt_forwarding: YesNo,

    #[serde(rename = "EnableFirewdLocalNat")]
    enable_firewd_local_nat: YesNo,

    #[serde(rename = "EnableIptLocalNat")]
    enable_ipt_local_nat: YesNo,

    #[serde(rename = "SudoExe", default)]
    /// Path to `sudo` (or equivalent) used when executing stanza commands
    /// as a different uid/gid.
    pub sudo_exe: String,

    #[serde(rename = "DefaultFwAccessTimeout")]
    /// Fallback access timeout, in seconds, applied when a stanza omits
    /// `fw_access_timeout`.
    pub default_fw_access_timeout: u32,
}

impl SpaConfig {
    pub fn spa_over_http(&self) -> bool {
        self.enable_spa_over_http.as_bool()
    }

    pub fn sdp_mode(&self) -> bool {
        !self.disable_sdp_mode.as_bool()
    }

    pub fn digest_persistence(&self) -> bool {
        self.enable_digest_persistence.as_bool()
    }

    pub fn packet_aging(&self) -> bool {
        self.enable_spa_packet_aging.as_bool()
    }

    pub fn legacy_access_requests(&self) -> bool {
        self.allow_legacy_access_requests.as_bool()
    }

    pub fn firewd_forwarding(&self) -> bool {
        self.enable_firewd_forwarding.as_bool()
    }

    pub fn ipt_forwarding(&self) -> bool {
        self.enable_ipt_forwarding.as_bool()
    }

    pub fn firewd_local_nat(&self) -> bool {
        self.enable_firewd_local_nat.as_bool()
    }

    pub fn ipt_local_nat(&self) -> bool {
        self.enable_ipt_local_nat.as_bool()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Persistent replay-suppression digest cache.
pub struct ReplayConfig {
    #[serde(rename = "DigestDbFile")]
    /// Path to the embedded key-value store backing the replay cache.
    pub digest_db_file: String,
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.server.udp_serv_port >= 1, "UdpServPort must be >= 1");

        ensure!(
            self.server.select_timeout_usec >= 1
                && self.server.select_timeout_usec <= 999_999,
            "SelectTimeoutUsec must be in 1..=999999"
        );

        ensure!(
            !self.access_policy_path.is_empty(),
            "access_policy_path must not be empty"
        );

        ensure!(
            !self.replay.digest_db_file.is_empty(),
            "ReplayConfig.DigestDbFile must not be empty"
        );

        if self.spa.default_fw_access_timeout == 0 {
            self.spa.default_fw_access_timeout = 30;
        }

        Ok(())
    }
}
