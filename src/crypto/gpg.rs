// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Asymmetric decryption path: shells out to a `gpg` binary, matching
//! spec §5's bounded, blocking external-process model.

use std::{process::Stdio, time::Duration};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};
use tracing::warn;

use crate::{
    error::{SpaError, SpaResult},
    policy::stanza::GpgConfig,
};

const NON_PRIVILEGED_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GpgContext {
    ciphertext: Vec<u8>,
    cfg: GpgConfig,
    signature_id: Option<String>,
    signature_fpr: Option<String>,
}

impl GpgContext {
    pub fn new(b64_payload: &str, identity_prefix_len: usize, cfg: GpgConfig) -> SpaResult<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(b64_payload.as_bytes())
            .map_err(|_| SpaError::BadData("payload failed base64 decode in crypto layer".into()))?;

        if raw.len() <= identity_prefix_len {
            return Err(SpaError::DecryptFailure("payload too short after identity prefix".into()));
        }

        Ok(GpgContext {
            ciphertext: raw[identity_prefix_len..].to_vec(),
            cfg,
            signature_id: None,
            signature_fpr: None,
        })
    }

    /// Runs `gpg --decrypt` over the ciphertext, honoring the configured
    /// executable path, home directory, recipient, and passphrase. Blocks
    /// the pipeline for up to 5 seconds (spec §5, non-privileged path).
    pub async fn decrypt_async(&mut self) -> SpaResult<Vec<u8>> {
        let gpg_exe = if self.cfg.gpg_exe.is_empty() { "gpg" } else { &self.cfg.gpg_exe };

        let mut cmd = Command::new(gpg_exe);
        cmd.arg("--batch")
            .arg("--status-fd")
            .arg("2")
            .arg("--decrypt")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if !self.cfg.gpg_home_dir.is_empty() {
            cmd.arg("--homedir").arg(&self.cfg.gpg_home_dir);
        }
        if let Some(pw) = &self.cfg.gpg_decrypt_pw {
            cmd.arg("--passphrase").arg(pw);
        } else if !self.cfg.gpg_allow_no_pw {
            return Err(SpaError::FkoCtxError(
                "GPG stanza has no decrypt password and gpg_allow_no_pw is not set".into(),
            ));
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SpaError::FkoCtxError(format!("failed to spawn gpg: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&self.ciphertext)
                .await
                .map_err(|e| SpaError::FkoCtxError(format!("failed to write to gpg stdin: {e}")))?;
        }

        let output = timeout(NON_PRIVILEGED_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| SpaError::DecryptFailure("gpg decrypt timed out".into()))?
            .map_err(|e| SpaError::FkoCtxError(format!("failed to wait on gpg: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        self.parse_status_fd(&stderr);

        if !output.status.success() {
            if self.cfg.gpg_require_sig && !self.cfg.gpg_ignore_sig_error {
                return Err(SpaError::DecryptFailure("gpg exited non-zero and signature is required".into()));
            }
            warn!(stderr = %stderr, "gpg decrypt exited non-zero");
            return Err(SpaError::DecryptFailure("gpg decrypt failed".into()));
        }

        if self.cfg.gpg_require_sig {
            self.verify_signer()?;
        }

        Ok(output.stdout)
    }

    fn parse_status_fd(&mut self, stderr: &str) {
        for line in stderr.lines() {
            if let Some(rest) = line.strip_prefix("[GNUPG:] GOODSIG ") {
                self.signature_id = rest.split_whitespace().next().map(str::to_string);
            }
            if let Some(rest) = line.strip_prefix("[GNUPG:] VALIDSIG ") {
                self.signature_fpr = rest.split_whitespace().next().map(str::to_string);
            }
        }
    }

    fn verify_signer(&self) -> SpaResult<()> {
        if !self.cfg.gpg_remote_fpr_list.is_empty() {
            let fpr = self
                .signature_fpr
                .as_deref()
                .ok_or_else(|| SpaError::DecryptFailure("no GPG fingerprint in gpg output".into()))?;
            if !self.cfg.gpg_remote_fpr_list.iter().any(|f| f == fpr) {
                return Err(SpaError::DecryptFailure(format!(
                    "signer fingerprint {fpr} not in allow-list"
                )));
            }
            return Ok(());
        }

        if !self.cfg.gpg_remote_id_list.is_empty() {
            let id = self
                .signature_id
                .as_deref()
                .ok_or_else(|| SpaError::DecryptFailure("no GPG signature id in gpg output".into()))?;
            if !self.cfg.gpg_remote_id_list.iter().any(|i| i == id) {
                return Err(SpaError::DecryptFailure(format!("signer id {id} not in allow-list")));
            }
        }

        Ok(())
    }

    pub fn gpg_signature_id(&self) -> Option<&str> {
        self.signature_id.as_deref()
    }

    pub fn gpg_signature_fpr(&self) -> Option<&str> {
        self.signature_fpr.as_deref()
    }
}

impl Drop for GpgContext {
    fn drop(&mut self) {
        self.ciphertext.fill(0);
    }
}
