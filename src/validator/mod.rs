// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Message Validator (C5): the ordered policy checks run against a
//! successfully decrypted payload, against one candidate stanza.

use std::{net::Ipv4Addr, sync::Arc};

use tracing::debug;

use crate::{
    cfg::config::SpaConfig,
    message::DecodedMessage,
    packet::types::{MAX_IPV4_STR_LEN, MIN_IPV4_STR_LEN},
    policy::{AccessStanza, service_acl},
};

/// Outcome of validating one decrypted message against one stanza.
pub enum Verdict {
    /// The message is authorized under this stanza.
    Accept(Arc<AccessStanza>, DecodedMessage),
    /// This stanza does not grant the request; the orchestrator may try
    /// another candidate.
    KeepSearching,
    /// The request is explicitly denied and no other stanza should be
    /// tried for this packet.
    StopSearching(String),
}

/// Runs the full C5 sequence against `decoded`, matched against `stanza`.
///
/// `packet_src_ip`/`packet_dst_ip` are the UDP datagram's actual
/// source/destination; `identity_mode` disables the username check
/// (meaningless once a stanza was already selected by identity rather than
/// by source address).
pub fn validate(
    stanza: &Arc<AccessStanza>,
    mut decoded: DecodedMessage,
    packet_src_ip: Ipv4Addr,
    packet_dst_ip: Ipv4Addr,
    spa_cfg: &SpaConfig,
    now: i64,
    identity_mode: bool,
) -> Verdict {
    debug!(
        stanza = stanza.stanza_num,
        username = %decoded.username,
        message_type = ?decoded.message_type,
        "validating decoded message"
    );

    if !decoded.message_type.is_modern() && !spa_cfg.legacy_access_requests() {
        return Verdict::StopSearching(format!(
            "message type {:?} rejected: legacy access requests are disabled",
            decoded.message_type
        ));
    }

    if !stanza.dest_matches(packet_dst_ip) {
        return Verdict::KeepSearching;
    }

    if let Err(reason) = check_gpg_signer(stanza, &decoded) {
        return Verdict::StopSearching(reason);
    }

    if spa_cfg.packet_aging() {
        let age = (now - decoded.timestamp).abs();
        if age > i64::from(spa_cfg.max_spa_packet_age) {
            return Verdict::KeepSearching;
        }
    }

    if stanza.access_expire_time > 0 && now > stanza.access_expire_time {
        stanza.mark_expired();
        return Verdict::KeepSearching;
    }

    let (src_ip_str, remainder) = match decoded.split_body() {
        Some((ip, rest)) => (ip.to_string(), rest.to_string()),
        None => return Verdict::KeepSearching,
    };

    if !(MIN_IPV4_STR_LEN - 1..=MAX_IPV4_STR_LEN).contains(&src_ip_str.len()) {
        return Verdict::KeepSearching;
    }
    let embedded_ip: Ipv4Addr = match src_ip_str.parse() {
        Ok(ip) => ip,
        Err(_) => return Verdict::KeepSearching,
    };

    if src_ip_str == "0.0.0.0" && stanza.require_source_address {
        return Verdict::StopSearching("stanza requires a non-zero source address".into());
    }
    decoded.effective_source_ip = Some(if src_ip_str == "0.0.0.0" { packet_src_ip } else { embedded_ip });
    // Dispatch only ever needs the remainder: the embedded source IP has
    // already been captured above.
    decoded.message_body = remainder.clone();

    if !identity_mode {
        if let Some(required) = &stanza.require_username {
            if required != &decoded.username {
                return Verdict::KeepSearching;
            }
        }
    }

    if decoded.message_type.is_nat_variant() {
        let supported = if decoded.message_type.is_local_nat() {
            spa_cfg.ipt_local_nat() || spa_cfg.firewd_local_nat()
        } else {
            spa_cfg.ipt_forwarding() || spa_cfg.firewd_forwarding()
        };
        if !supported {
            return Verdict::StopSearching(format!(
                "NAT message type {:?} rejected: backend does not have the corresponding forwarding mode enabled",
                decoded.message_type
            ));
        }
    }

    if decoded.message_type.is_service_access() {
        if !service_acl::check_service_access(stanza, &remainder) {
            return Verdict::StopSearching(format!("service ACL denied request {remainder:?}"));
        }
    } else if !decoded.message_type.is_command() && !service_acl::check_port_proto(stanza, &remainder) {
        return Verdict::KeepSearching;
    }

    Verdict::Accept(Arc::clone(stanza), decoded)
}

fn check_gpg_signer(stanza: &AccessStanza, decoded: &DecodedMessage) -> Result<(), String> {
    let Some(gpg) = &stanza.gpg else { return Ok(()) };
    if !gpg.gpg_require_sig {
        return Ok(());
    }

    if !gpg.gpg_remote_fpr_list.is_empty() {
        let fpr = decoded
            .gpg_signer_fpr
            .as_deref()
            .ok_or_else(|| "gpg signature required but no fingerprint present".to_string())?;
        if !gpg.gpg_remote_fpr_list.iter().any(|f| f == fpr) {
            return Err(format!("signer fingerprint {fpr} not in allow-list"));
        }
        return Ok(());
    }

    if !gpg.gpg_remote_id_list.is_empty() {
        let id = decoded
            .gpg_signer_id
            .as_deref()
            .ok_or_else(|| "gpg signature required but no signer id present".to_string())?;
        if !gpg.gpg_remote_id_list.iter().any(|i| i == id) {
            return Err(format!("signer id {id} not in allow-list"));
        }
    }

    Ok(())
}
