// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::Ipv4Addr;

/// Lower bound on a raw SPA datagram, in bytes. Below this, the payload
/// cannot possibly carry a base64-encoded ciphertext plus HMAC.
pub const MIN_SPA_DATA_SIZE: usize = 11;

/// Upper bound on a raw SPA datagram. Anything longer is rejected before
/// any decoding is attempted.
pub const MAX_SPA_PACKET_LEN: usize = 1500;

/// Base64 encoding of libfko's `"Salted__"` Rijndael prefix, and its length
/// in characters.
pub const B64_RIJNDAEL_SALT: &str = "U2FsdGVkX1";
pub const B64_RIJNDAEL_SALT_STR_LEN: usize = 10;

/// Minimum message length before the GnuPG prefix blacklist check is even
/// attempted.
pub const MIN_GNUPG_MSG_SIZE: usize = 50;
/// Base64 encoding of GnuPG's packet-format prefix bytes, and its length in
/// characters.
pub const B64_GPG_PREFIX: &str = "hQEMA0qZmg";
pub const B64_GPG_PREFIX_STR_LEN: usize = 10;

/// Number of leading base64 characters that encode a 4-byte client
/// identity when identity mode is enabled.
pub const B64_SDP_ID_STR_LEN: usize = 8;
pub const SDP_ID_SIZE: usize = 4;
/// Raw bytes consumed by the identity prefix once base64-decoded (8 base64
/// characters decode to exactly 6 bytes), skipped before the crypto layer
/// sees the envelope.
pub const IDENTITY_PREFIX_RAW_LEN: usize = 6;

/// Embedded-source-IP length bounds (see `message_body` parsing, C5 step
/// 6): `"1.2.3.4"` is 7 characters, hence the `-1`.
pub const MIN_IPV4_STR_LEN: usize = 8;
pub const MAX_IPV4_STR_LEN: usize = 15;

/// A single inbound datagram, owned end to end by the pipeline.
///
/// Produced once by the receiver loop and moved through preprocessing,
/// replay screening, and decryption; nothing aliases it.
#[derive(Debug, Clone)]
pub struct Packet {
    payload: Vec<u8>,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

impl Packet {
    pub fn new(
        payload: Vec<u8>,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
    ) -> Self {
        Packet {
            payload,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub(crate) fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }
}

/// Normalized output of the Packet Preprocessor: the base64 payload the
/// crypto layer will consume, plus the identity extracted from its clear
/// prefix when identity mode is enabled.
#[derive(Debug, Clone)]
pub struct NormalizedPacket {
    pub b64_payload: String,
    pub identity_numeric: Option<u32>,
    pub identity_text: Option<String>,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}
