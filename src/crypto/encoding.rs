// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Plaintext envelope parsing shared by both decryption paths: the field
//! layout is a property of the protocol, not of which cipher produced the
//! bytes.

use crate::{
    error::{SpaError, SpaResult},
    message::{DecodedMessage, MessageType},
};

/// Parses decrypted plaintext into a [`DecodedMessage`]. Field layout:
/// `version:timestamp:username:message_type:message_body:nat_access:server_auth:client_timeout`,
/// colon-delimited at the top level (distinct from the comma-delimited
/// `message_body`).
pub fn parse_plaintext(plaintext: &[u8]) -> SpaResult<DecodedMessage> {
    let text = std::str::from_utf8(plaintext)
        .map_err(|_| SpaError::DecryptFailure("plaintext is not valid UTF-8".into()))?;

    let mut fields = text.splitn(8, ':');
    let mut next = |name: &str| -> SpaResult<&str> {
        fields
            .next()
            .ok_or_else(|| SpaError::DecryptFailure(format!("plaintext missing field {name}")))
    };

    let version = next("version")?.to_string();
    let timestamp: i64 = next("timestamp")?
        .parse()
        .map_err(|_| SpaError::DecryptFailure("timestamp is not an integer".into()))?;
    let username = next("username")?.to_string();
    let message_type = parse_message_type(next("message_type")?)?;
    let message_body = next("message_body")?.to_string();
    let nat_access = non_empty(next("nat_access")?);
    let server_auth = non_empty(next("server_auth")?);
    let client_timeout: u32 = next("client_timeout")?.parse().unwrap_or(0);

    Ok(DecodedMessage {
        version,
        timestamp,
        username,
        message_type,
        message_body,
        nat_access,
        server_auth,
        client_timeout,
        effective_source_ip: None,
        gpg_signer_id: None,
        gpg_signer_fpr: None,
    })
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_message_type(s: &str) -> SpaResult<MessageType> {
    Ok(match s {
        "ACCESS" => MessageType::Access,
        "CLIENT_TIMEOUT_ACCESS" => MessageType::ClientTimeoutAccess,
        "NAT_ACCESS" => MessageType::NatAccess,
        "CLIENT_TIMEOUT_NAT_ACCESS" => MessageType::ClientTimeoutNatAccess,
        "LOCAL_NAT_ACCESS" => MessageType::LocalNatAccess,
        "CLIENT_TIMEOUT_LOCAL_NAT_ACCESS" => MessageType::ClientTimeoutLocalNatAccess,
        "SERVICE_ACCESS" => MessageType::ServiceAccess,
        "CLIENT_TIMEOUT_SERVICE_ACCESS" => MessageType::ClientTimeoutServiceAccess,
        "COMMAND" => MessageType::Command,
        other => return Err(SpaError::NotSpaData(format!("unrecognized message type {other}"))),
    })
}
