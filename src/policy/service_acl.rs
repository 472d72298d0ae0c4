// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scope policy (C5 step 10): service ACL for `SERVICE_ACCESS` messages,
//! port/proto ACL for everything else.

use super::stanza::{AccessStanza, Proto};

/// Runs the service ACL against a `SERVICE_ACCESS` message's service id
/// list (`message_body` remainder, comma-separated service names). A
/// denial here is `STOP_SEARCHING`: the policy was explicit about which
/// services it grants.
pub fn check_service_access(stanza: &AccessStanza, requested: &str) -> bool {
    if stanza.service_ids.is_empty() {
        return false;
    }
    requested
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .all(|svc| stanza.service_ids.iter().any(|allowed| allowed == svc))
}

/// Runs the port/proto ACL against a non-service message's remainder
/// (comma-separated `proto/port` pairs). A denial here is
/// `KEEP_SEARCHING`: another stanza may open broader ports.
pub fn check_port_proto(stanza: &AccessStanza, requested: &str) -> bool {
    let requests: Vec<(Proto, u16)> = requested
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(parse_req)
        .collect();

    if requests.is_empty() {
        return false;
    }

    requests.iter().all(|&(proto, port)| {
        let restricted = stanza
            .restrict_ports
            .iter()
            .any(|p| p.proto == proto && p.port == port);
        if restricted {
            return false;
        }
        stanza.open_ports.is_empty()
            || stanza
                .open_ports
                .iter()
                .any(|p| p.proto == proto && p.port == port)
    })
}

fn parse_req(s: &str) -> Option<(Proto, u16)> {
    let (proto, port) = s.split_once('/')?;
    let proto = match proto.to_ascii_lowercase().as_str() {
        "tcp" => Proto::Tcp,
        "udp" => Proto::Udp,
        _ => return None,
    };
    Some((proto, port.parse().ok()?))
}
