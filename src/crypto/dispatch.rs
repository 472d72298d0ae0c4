// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Crypto Dispatcher (C4): for one candidate stanza, picks a decryption
//! path and attempts it, mirroring the original decision matrix: a
//! Rijndael attempt is gated on the detected wire type or an explicit
//! command-exec override, and a GPG attempt only runs once no symmetric
//! success has already been recorded.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use tracing::{debug, warn};

use super::{context::CryptoContext, gpg::GpgContext, rijndael::RijndaelContext};
use crate::{
    cfg::enums::EncryptionType,
    error::{SpaError, SpaResult},
    message::DecodedMessage,
    packet::types::IDENTITY_PREFIX_RAW_LEN,
    policy::AccessStanza,
};

/// Outcome of one stanza's decryption attempt.
pub enum DecryptOutcome {
    /// Decryption and plaintext parsing both succeeded.
    Accepted(DecodedMessage),
    /// Neither path applies to this stanza; the caller should try the next
    /// candidate without logging a failure.
    NotAttempted,
    /// A path was attempted and failed (wrong key, bad HMAC, GPG error).
    Failed,
}

/// Attempts decryption of `b64_payload` against one stanza's credentials.
///
/// Mirrors the decision matrix: Rijndael is attempted when the stanza
/// carries a symmetric key and either the sniffed wire type is Rijndael or
/// the stanza enables command execution; GPG is attempted only if no
/// symmetric success was recorded, the sniffed wire type is GPG, and the
/// stanza has a usable passphrase or explicitly allows none.
pub async fn decrypt_with_stanza(stanza: &AccessStanza, b64_payload: &str, has_identity: bool) -> DecryptOutcome {
    let identity_prefix_len = if has_identity { IDENTITY_PREFIX_RAW_LEN } else { 0 };
    let detected = sniff_type(b64_payload, identity_prefix_len);

    let mut attempted = false;
    let mut cmd_exec_success = false;

    if stanza.use_rijndael() && (detected == EncryptionType::Rijndael || stanza.exec.enable_cmd_exec) {
        attempted = true;
        match try_rijndael(stanza, b64_payload, identity_prefix_len) {
            Ok(decoded) => {
                cmd_exec_success = true;
                return DecryptOutcome::Accepted(decoded);
            },
            Err(e) => debug!(stanza = stanza.stanza_num, error = %e, "rijndael decrypt attempt failed"),
        }
    }

    if stanza.use_gpg() && detected == EncryptionType::Gpg && !cmd_exec_success {
        attempted = true;
        match try_gpg(stanza, b64_payload, identity_prefix_len).await {
            Ok(decoded) => return DecryptOutcome::Accepted(decoded),
            Err(e) => warn!(stanza = stanza.stanza_num, error = %e, "gpg decrypt attempt failed"),
        }
    }

    if attempted { DecryptOutcome::Failed } else { DecryptOutcome::NotAttempted }
}

fn sniff_type(b64_payload: &str, identity_prefix_len: usize) -> EncryptionType {
    let Ok(raw) = URL_SAFE_NO_PAD.decode(b64_payload.as_bytes()) else {
        return EncryptionType::Unknown;
    };
    if raw.len() <= identity_prefix_len {
        return EncryptionType::Unknown;
    }
    EncryptionType::detect(&raw[identity_prefix_len..])
}

fn try_rijndael(stanza: &AccessStanza, b64_payload: &str, identity_prefix_len: usize) -> SpaResult<DecodedMessage> {
    let sym_key = stanza
        .sym_key
        .clone()
        .ok_or_else(|| SpaError::InternalError("use_rijndael() true but sym_key missing".into()))?;
    let hmac_key = stanza.hmac_key.clone().unwrap_or_default();

    let mut ctx = RijndaelContext::new(b64_payload, identity_prefix_len, sym_key, hmac_key, stanza.hmac_type)?;
    ctx.decrypt()
}

async fn try_gpg(stanza: &AccessStanza, b64_payload: &str, identity_prefix_len: usize) -> SpaResult<DecodedMessage> {
    let cfg = stanza
        .gpg
        .clone()
        .ok_or_else(|| SpaError::InternalError("use_gpg() true but gpg config missing".into()))?;

    if cfg.gpg_decrypt_pw.is_none() && !cfg.gpg_allow_no_pw {
        return Err(SpaError::FkoCtxError(
            "gpg stanza has no decrypt password and does not allow none".into(),
        ));
    }

    let mut ctx = GpgContext::new(b64_payload, identity_prefix_len, cfg)?;
    let plaintext = ctx.decrypt_async().await?;
    let mut decoded = super::encoding::parse_plaintext(&plaintext)?;
    decoded.gpg_signer_id = ctx.gpg_signature_id().map(str::to_string);
    decoded.gpg_signer_fpr = ctx.gpg_signature_fpr().map(str::to_string);
    Ok(decoded)
}
