// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Symmetric decryption path: AES-CBC plus an HMAC computed over the IV and
//! ciphertext, verified in constant time before the plaintext is trusted
//! (spec §4.4: "Decryption returning success implies HMAC validated.").

use aes::{Aes128, Aes256};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::{context::CryptoContext, encoding::parse_plaintext};
use crate::{
    cfg::enums::HmacType,
    error::{SpaError, SpaResult},
    message::DecodedMessage,
};

const IV_LEN: usize = 16;

/// Envelope layout after base64 decoding, identity prefix already stripped
/// by the caller: `IV (16 bytes) || ciphertext || HMAC digest`.
pub struct RijndaelContext {
    sym_key: Vec<u8>,
    hmac_key: Vec<u8>,
    hmac_type: HmacType,
    ciphertext_envelope: Vec<u8>,
    plaintext: Option<Vec<u8>>,
}

impl RijndaelContext {
    pub fn new(
        b64_payload: &str,
        identity_prefix_len: usize,
        sym_key: Vec<u8>,
        hmac_key: Vec<u8>,
        hmac_type: HmacType,
    ) -> SpaResult<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(b64_payload.as_bytes())
            .map_err(|_| SpaError::BadData("payload failed base64 decode in crypto layer".into()))?;

        if raw.len() <= identity_prefix_len {
            return Err(SpaError::DecryptFailure("payload too short after identity prefix".into()));
        }

        Ok(RijndaelContext {
            sym_key,
            hmac_key,
            hmac_type,
            ciphertext_envelope: raw[identity_prefix_len..].to_vec(),
            plaintext: None,
        })
    }

    fn verify_hmac(&self) -> SpaResult<()> {
        let digest_len = match self.hmac_type {
            HmacType::Sha1 => 20,
            HmacType::Sha256 => 32,
            HmacType::Sha384 => 48,
            HmacType::Sha512 => 64,
        };

        if self.ciphertext_envelope.len() <= IV_LEN + digest_len {
            return Err(SpaError::DecryptFailure("envelope too short for IV + HMAC".into()));
        }

        let (signed, tag) = self
            .ciphertext_envelope
            .split_at(self.ciphertext_envelope.len() - digest_len);

        let computed = compute_hmac(self.hmac_type, &self.hmac_key, signed)?;

        if computed.ct_eq(tag).unwrap_u8() != 1 {
            return Err(SpaError::DecryptFailure("HMAC verification failed".into()));
        }

        Ok(())
    }

    fn decrypt_ciphertext(&self) -> SpaResult<Vec<u8>> {
        let digest_len = match self.hmac_type {
            HmacType::Sha1 => 20,
            HmacType::Sha256 => 32,
            HmacType::Sha384 => 48,
            HmacType::Sha512 => 64,
        };
        let signed_len = self.ciphertext_envelope.len() - digest_len;
        let (iv, ciphertext) = self.ciphertext_envelope[..signed_len].split_at(IV_LEN);

        match self.sym_key.len() {
            32 => {
                let mut buf = ciphertext.to_vec();
                let mut iv_arr = [0u8; IV_LEN];
                iv_arr.copy_from_slice(iv);
                let decryptor = cbc::Decryptor::<Aes256>::new(self.sym_key.as_slice().into(), &iv_arr.into());
                let pt = decryptor
                    .decrypt_padded_mut::<Pkcs7>(&mut buf)
                    .map_err(|_| SpaError::DecryptFailure("AES-256-CBC padding invalid".into()))?;
                Ok(pt.to_vec())
            },
            _ => {
                let mut key = self.sym_key.clone();
                key.resize(16, 0);
                let mut buf = ciphertext.to_vec();
                let mut iv_arr = [0u8; IV_LEN];
                iv_arr.copy_from_slice(iv);
                let decryptor = cbc::Decryptor::<Aes128>::new(key.as_slice().into(), &iv_arr.into());
                let pt = decryptor
                    .decrypt_padded_mut::<Pkcs7>(&mut buf)
                    .map_err(|_| SpaError::DecryptFailure("AES-128-CBC padding invalid".into()))?;
                Ok(pt.to_vec())
            },
        }
    }
}

fn compute_hmac(hmac_type: HmacType, key: &[u8], data: &[u8]) -> SpaResult<Vec<u8>> {
    fn run<D: hmac::digest::Mac>(mut mac: D, data: &[u8]) -> Vec<u8> {
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    Ok(match hmac_type {
        HmacType::Sha1 => run(
            Hmac::<Sha1>::new_from_slice(key)
                .map_err(|_| SpaError::FkoCtxError("invalid HMAC-SHA1 key length".into()))?,
            data,
        ),
        HmacType::Sha256 => run(
            Hmac::<Sha256>::new_from_slice(key)
                .map_err(|_| SpaError::FkoCtxError("invalid HMAC-SHA256 key length".into()))?,
            data,
        ),
        HmacType::Sha384 => run(
            Hmac::<Sha384>::new_from_slice(key)
                .map_err(|_| SpaError::FkoCtxError("invalid HMAC-SHA384 key length".into()))?,
            data,
        ),
        HmacType::Sha512 => run(
            Hmac::<Sha512>::new_from_slice(key)
                .map_err(|_| SpaError::FkoCtxError("invalid HMAC-SHA512 key length".into()))?,
            data,
        ),
    })
}

impl CryptoContext for RijndaelContext {
    fn decrypt(&mut self) -> SpaResult<DecodedMessage> {
        self.verify_hmac()?;
        let plaintext = self.decrypt_ciphertext()?;
        let decoded = parse_plaintext(&plaintext)?;
        self.plaintext = Some(plaintext);
        Ok(decoded)
    }
}

impl Drop for RijndaelContext {
    fn drop(&mut self) {
        self.sym_key.fill(0);
        self.hmac_key.fill(0);
        if let Some(pt) = self.plaintext.as_mut() {
            pt.fill(0);
        }
    }
}
