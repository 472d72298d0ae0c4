// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// SPA message type, carried inside the encrypted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum MessageType {
    Access,
    ClientTimeoutAccess,
    NatAccess,
    ClientTimeoutNatAccess,
    LocalNatAccess,
    ClientTimeoutLocalNatAccess,
    ServiceAccess,
    ClientTimeoutServiceAccess,
    Command,
}

impl MessageType {
    /// Types admitted by C5 step 2 without the legacy-access override.
    pub fn is_modern(self) -> bool {
        matches!(
            self,
            MessageType::ServiceAccess
                | MessageType::ClientTimeoutServiceAccess
                | MessageType::Command
        )
    }

    pub fn is_nat_variant(self) -> bool {
        matches!(
            self,
            MessageType::NatAccess
                | MessageType::ClientTimeoutNatAccess
                | MessageType::LocalNatAccess
                | MessageType::ClientTimeoutLocalNatAccess
        )
    }

    pub fn is_local_nat(self) -> bool {
        matches!(
            self,
            MessageType::LocalNatAccess | MessageType::ClientTimeoutLocalNatAccess
        )
    }

    pub fn is_service_access(self) -> bool {
        matches!(self, MessageType::ServiceAccess | MessageType::ClientTimeoutServiceAccess)
    }

    pub fn is_command(self) -> bool {
        matches!(self, MessageType::Command)
    }
}

/// The fully decoded contents of one successfully decrypted SPA payload.
///
/// `message_body` always begins with a dotted-quad source IP followed by
/// `,` and a type-specific remainder (port/proto list or command string);
/// splitting that out is the Validator's job (C5 step 6), not this type's.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub version: String,
    pub timestamp: i64,
    pub username: String,
    pub message_type: MessageType,
    pub message_body: String,
    pub nat_access: Option<String>,
    pub server_auth: Option<String>,
    pub client_timeout: u32,
    /// Populated by the Validator after embedded-source parsing; absent
    /// immediately after decryption.
    pub effective_source_ip: Option<Ipv4Addr>,
    /// GPG signer identity, populated by the Crypto Dispatcher when the
    /// asymmetric path produced this message; `None` for the symmetric path.
    pub gpg_signer_id: Option<String>,
    pub gpg_signer_fpr: Option<String>,
}

impl DecodedMessage {
    /// Splits `message_body` into the embedded source-IP string and the
    /// remainder, per C5 step 6. Does not validate the IP string's shape;
    /// callers enforce the length bound before parsing.
    pub fn split_body(&self) -> Option<(&str, &str)> {
        self.message_body.split_once(',')
    }
}
