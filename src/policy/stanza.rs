// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::Ipv4Addr,
    sync::atomic::{AtomicBool, Ordering},
};

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::cfg::enums::{EncryptionMode, HmacType};

/// GPG credential and policy fragment, only meaningful when `use_gpg` is
/// set.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct GpgConfig {
    #[serde(default)]
    pub gpg_exe: String,
    #[serde(default)]
    pub gpg_home_dir: String,
    #[serde(default)]
    pub gpg_decrypt_id: String,
    #[serde(default)]
    pub gpg_decrypt_pw: Option<String>,
    #[serde(default)]
    pub gpg_allow_no_pw: bool,
    #[serde(default)]
    pub gpg_require_sig: bool,
    #[serde(default)]
    pub gpg_ignore_sig_error: bool,
    #[serde(default)]
    pub gpg_remote_id_list: Vec<String>,
    #[serde(default)]
    pub gpg_remote_fpr_list: Vec<String>,
}

/// Execution policy for `COMMAND`-type messages and command-cycle.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ExecPolicy {
    #[serde(default)]
    pub enable_cmd_exec: bool,
    #[serde(default)]
    pub enable_cmd_sudo_exec: bool,
    #[serde(default)]
    pub cmd_exec_user: String,
    #[serde(default)]
    pub cmd_exec_group: String,
    #[serde(default)]
    pub cmd_exec_uid: u32,
    #[serde(default)]
    pub cmd_exec_gid: u32,
    #[serde(default)]
    pub cmd_cycle_open: Option<String>,
}

/// One access-policy entry: a client's credentials, match predicates,
/// authorization scope, and timing, loaded at startup and held for the
/// lifetime of the process (or until a reload swaps the whole [`super::index::PolicySet`]
/// atomically).
#[derive(Debug)]
pub struct AccessStanza {
    pub stanza_num: usize,
    pub identity: Option<String>,

    pub sym_key: Option<Vec<u8>>,
    pub hmac_key: Option<Vec<u8>>,
    pub hmac_type: HmacType,
    pub encryption_mode: EncryptionMode,
    pub gpg: Option<GpgConfig>,

    pub source_list: Vec<Ipv4Network>,
    pub destination_list: Vec<Ipv4Network>,
    pub require_username: Option<String>,
    pub require_source_address: bool,

    pub open_ports: Vec<PortSpec>,
    pub restrict_ports: Vec<PortSpec>,
    pub service_ids: Vec<String>,

    pub exec: ExecPolicy,

    pub fw_access_timeout: Option<u32>,
    pub access_expire_time: i64,
    pub(crate) expired: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy)]
pub struct PortSpec {
    pub proto: Proto,
    pub port: u16,
}

impl AccessStanza {
    pub fn use_rijndael(&self) -> bool {
        self.sym_key.is_some()
    }

    pub fn use_gpg(&self) -> bool {
        self.gpg.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Relaxed)
    }

    /// Monotonic false→true transition (spec §5: readers that miss a
    /// concurrent set only defer the rejection by one packet).
    pub fn mark_expired(&self) {
        self.expired.store(true, Ordering::Relaxed);
    }

    pub fn source_matches(&self, ip: Ipv4Addr) -> bool {
        self.source_list.iter().any(|net| net.contains(ip))
    }

    pub fn dest_matches(&self, ip: Ipv4Addr) -> bool {
        self.destination_list.is_empty() || self.destination_list.iter().any(|net| net.contains(ip))
    }
}

/// Serde-facing mirror of [`AccessStanza`] used only by the YAML loader;
/// converted into the atomic-field-bearing runtime type once parsed.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct AccessStanzaDef {
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub sym_key: Option<String>,
    #[serde(default)]
    pub hmac_key: Option<String>,
    #[serde(default)]
    pub hmac_type: HmacType,
    #[serde(default)]
    pub encryption_mode: EncryptionMode,
    #[serde(default)]
    pub gpg: Option<GpgConfig>,
    #[serde(default)]
    pub source_list: Vec<String>,
    #[serde(default)]
    pub destination_list: Vec<String>,
    #[serde(default)]
    pub require_username: Option<String>,
    #[serde(default)]
    pub require_source_address: bool,
    #[serde(default)]
    pub open_ports: Vec<String>,
    #[serde(default)]
    pub restrict_ports: Vec<String>,
    #[serde(default)]
    pub service_ids: Vec<String>,
    #[serde(default)]
    pub exec: ExecPolicy,
    #[serde(default)]
    pub fw_access_timeout: Option<u32>,
    #[serde(default)]
    pub access_expire_time: i64,
}

impl AccessStanzaDef {
    pub(crate) fn into_runtime(self, stanza_num: usize) -> anyhow::Result<AccessStanza> {
        use anyhow::Context;

        let source_list = self
            .source_list
            .iter()
            .map(|s| parse_cidr(s))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("stanza #{stanza_num}: bad source_list entry"))?;
        let destination_list = self
            .destination_list
            .iter()
            .map(|s| parse_cidr(s))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("stanza #{stanza_num}: bad destination_list entry"))?;
        let open_ports = self
            .open_ports
            .iter()
            .map(|s| parse_port_spec(s))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("stanza #{stanza_num}: bad open_ports entry"))?;
        let restrict_ports = self
            .restrict_ports
            .iter()
            .map(|s| parse_port_spec(s))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("stanza #{stanza_num}: bad restrict_ports entry"))?;

        Ok(AccessStanza {
            stanza_num,
            identity: self.identity,
            sym_key: self.sym_key.map(String::into_bytes),
            hmac_key: self.hmac_key.map(String::into_bytes),
            hmac_type: self.hmac_type,
            encryption_mode: self.encryption_mode,
            gpg: self.gpg,
            source_list,
            destination_list,
            require_username: self.require_username,
            require_source_address: self.require_source_address,
            open_ports,
            restrict_ports,
            service_ids: self.service_ids,
            exec: self.exec,
            fw_access_timeout: self.fw_access_timeout,
            access_expire_time: self.access_expire_time,
            expired: AtomicBool::new(false),
        })
    }
}

fn parse_cidr(s: &str) -> anyhow::Result<Ipv4Network> {
    if let Ok(net) = s.parse::<Ipv4Network>() {
        return Ok(net);
    }
    let addr: Ipv4Addr = s.parse()?;
    Ok(Ipv4Network::new(addr, 32)?)
}

fn parse_port_spec(s: &str) -> anyhow::Result<PortSpec> {
    let (proto, port) = s
        .split_once('/')
        .ok_or_else(|| anyhow::anyhow!("expected proto/port, got {s:?}"))?;
    let proto = match proto.to_ascii_lowercase().as_str() {
        "tcp" => Proto::Tcp,
        "udp" => Proto::Udp,
        other => anyhow::bail!("unknown protocol {other:?}"),
    };
    let port: u16 = port.parse()?;
    Ok(PortSpec { proto, port })
}
