// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Firewall actuator (spec §1: "the firewall actuator ... interfaces
//! only"). The core never manipulates rules directly; it calls through
//! this seam, whose only implementation here logs the grant.

use std::net::Ipv4Addr;

use tracing::info;

use crate::message::DecodedMessage;

/// One authorized access grant, ready for the firewall actuator.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub source_ip: Ipv4Addr,
    pub message_body: String,
    pub timeout_secs: u32,
}

impl AccessGrant {
    pub fn from_decoded(decoded: &DecodedMessage, timeout_secs: u32) -> Self {
        AccessGrant {
            source_ip: decoded.effective_source_ip.unwrap_or(Ipv4Addr::UNSPECIFIED),
            message_body: decoded.message_body.clone(),
            timeout_secs,
        }
    }
}

/// Actual nftables/iptables/firewalld manipulation is explicitly out of
/// scope. This logs the grant it would have opened, which is enough to
/// drive the pipeline end to end without a privileged firewall backend.
pub struct LoggingFirewall;

impl LoggingFirewall {
    pub async fn process_spa_request(&self, grant: &AccessGrant) {
        info!(
            source_ip = %grant.source_ip,
            body = %grant.message_body,
            timeout_secs = grant.timeout_secs,
            "granting temporary firewall access"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;

    #[tokio::test]
    async fn logging_firewall_does_not_panic() {
        let decoded = DecodedMessage {
            version: "1.0".into(),
            timestamp: 0,
            username: "alice".into(),
            message_type: MessageType::ServiceAccess,
            message_body: "1.2.3.4,ssh".into(),
            nat_access: None,
            server_auth: None,
            client_timeout: 0,
            effective_source_ip: Some("1.2.3.4".parse().unwrap()),
            gpg_signer_id: None,
            gpg_signer_fpr: None,
        };
        let grant = AccessGrant::from_decoded(&decoded, 30);
        LoggingFirewall.process_spa_request(&grant).await;
    }
}
