// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Cheap structural validation, HTTP-tunnel unwrapping, and identity
//! extraction (C1). Runs before any cryptographic work.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::types::{
    B64_GPG_PREFIX, B64_RIJNDAEL_SALT, B64_SDP_ID_STR_LEN, MAX_SPA_PACKET_LEN,
    MIN_GNUPG_MSG_SIZE, MIN_SPA_DATA_SIZE, NormalizedPacket, Packet, SDP_ID_SIZE,
};
use crate::error::{SpaError, SpaResult};

/// Constant-time prefix comparison: `haystack` is the candidate payload,
/// `prefix` the known blacklisted string. Short-circuits on length only,
/// never on byte content.
fn constant_time_prefix_eq(haystack: &[u8], prefix: &[u8]) -> bool {
    if haystack.len() < prefix.len() {
        return false;
    }
    haystack[..prefix.len()].ct_eq(prefix).into()
}

fn is_base64(payload: &[u8]) -> bool {
    URL_SAFE_NO_PAD.decode(payload).is_ok()
}

/// Runs the full C1 pipeline against one owned [`Packet`], producing a
/// [`NormalizedPacket`] ready for replay screening, or a rejection.
pub fn preprocess(packet: &Packet, enable_spa_over_http: bool, sdp_mode: bool) -> SpaResult<NormalizedPacket> {
    let len = packet.len();

    if !(MIN_SPA_DATA_SIZE..=MAX_SPA_PACKET_LEN).contains(&len) {
        return Err(SpaError::BadData(format!("packet length {len} out of range")));
    }

    let mut buf = packet.payload().to_vec();

    if constant_time_prefix_eq(&buf, B64_RIJNDAEL_SALT.as_bytes()) {
        return Err(SpaError::BadData("payload carries Rijndael salt prefix".into()));
    }

    if buf.len() > MIN_GNUPG_MSG_SIZE && constant_time_prefix_eq(&buf, B64_GPG_PREFIX.as_bytes())
    {
        return Err(SpaError::BadData("payload carries GnuPG prefix".into()));
    }

    if enable_spa_over_http && buf.starts_with(b"GET /") {
        let tail = &buf[5..];
        if contains_subslice(tail, b"User-Agent: Fwknop") {
            // The payload is URL-safe base64 already, so it needs no
            // unescaping to sit in a GET path; just take everything up to
            // the first whitespace.
            let decoded: Vec<u8> = tail.iter().copied().take_while(|b| !b.is_ascii_whitespace()).collect();
            if decoded.len() < MIN_SPA_DATA_SIZE {
                return Err(SpaError::BadData("HTTP tunnel payload too short".into()));
            }
            buf = decoded;
        }
    }

    if !is_base64(&buf) {
        return Err(SpaError::NotSpaData("payload is not valid base64".into()));
    }

    let (identity_numeric, identity_text) = if sdp_mode {
        extract_identity(&buf)?
    } else {
        (None, None)
    };

    let b64_payload = String::from_utf8(buf)
        .map_err(|_| SpaError::BadData("payload is not valid ASCII".into()))?;

    debug!(
        src_ip = %packet.src_ip,
        identity = ?identity_numeric,
        "preprocessed SPA datagram"
    );

    Ok(NormalizedPacket {
        b64_payload,
        identity_numeric,
        identity_text,
        src_ip: packet.src_ip,
        dst_ip: packet.dst_ip,
        src_port: packet.src_port,
        dst_port: packet.dst_port,
    })
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Decodes the leading `B64_SDP_ID_STR_LEN` base64 characters into a 4-byte
/// big-endian client identity.
fn extract_identity(buf: &[u8]) -> SpaResult<(Option<u32>, Option<String>)> {
    if buf.len() < B64_SDP_ID_STR_LEN {
        return Err(SpaError::NotSpaData("payload too short for an identity".into()));
    }

    let encoded = &buf[..B64_SDP_ID_STR_LEN];
    let decoded = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| SpaError::NotSpaData("identity segment is not valid base64".into()))?;

    if decoded.len() < SDP_ID_SIZE {
        return Err(SpaError::NotSpaData("decoded identity shorter than 4 bytes".into()));
    }

    let mut raw = [0u8; SDP_ID_SIZE];
    raw.copy_from_slice(&decoded[..SDP_ID_SIZE]);
    let id = u32::from_be_bytes(raw);

    if id == 0 {
        return Err(SpaError::NotSpaData("client identity must not be zero".into()));
    }

    Ok((Some(id), Some(id.to_string())))
}
