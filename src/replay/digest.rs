// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use sha2::{Digest, Sha256};

/// Computes the stable replay-suppression digest over the raw base64
/// payload (spec §4.2: "instantiating a decryption-less context and
/// extracting its raw SPA digest"). A single SHA-256 pass is equivalent:
/// it depends only on the bytes the sender transmitted, not on any key.
pub fn fingerprint(b64_payload: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b64_payload.as_bytes());
    hasher.finalize().into()
}

pub fn fingerprint_hex(b64_payload: &str) -> String {
    hex::encode(fingerprint(b64_payload))
}
