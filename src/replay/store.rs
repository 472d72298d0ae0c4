// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Mutex;

use pickledb::{PickleDb, PickleDbDumpPolicy, SerializationMethod};
use tracing::warn;

use super::digest::fingerprint_hex;
use crate::error::{SpaError, SpaResult};

/// Persistent set of digests, backed by an embedded key-value store (spec
/// §3 "ReplayStore"). All access is serialized through a single mutex,
/// matching the original's single-writer-at-a-time model; persistence is
/// flushed to disk on every successful insert so it survives a crash
/// between packets.
pub struct ReplayStore {
    db: Mutex<PickleDb>,
}

impl ReplayStore {
    pub fn open(path: &str) -> SpaResult<Self> {
        let db = PickleDb::load(
            path,
            PickleDbDumpPolicy::AutoDump,
            SerializationMethod::Json,
        )
        .or_else(|_| {
            Ok::<_, pickledb::error::Error>(PickleDb::new(
                path,
                PickleDbDumpPolicy::AutoDump,
                SerializationMethod::Json,
            ))
        })
        .map_err(|e| SpaError::DigestError(format!("failed to open replay store: {e}")))?;

        Ok(ReplayStore { db: Mutex::new(db) })
    }

    /// `screen` in spec terms: computes the digest and reports whether it
    /// has already been admitted, without inserting it. Insertion is the
    /// caller's job, deferred until after decryption succeeds (spec §4.2,
    /// P2): committing on mere receipt would let an attacker DoS a
    /// legitimate client by replaying the client's own ciphertext before
    /// the client does.
    pub fn contains(&self, b64_payload: &str) -> SpaResult<bool> {
        let digest = fingerprint_hex(b64_payload);
        let db = self
            .db
            .lock()
            .map_err(|_| SpaError::InternalError("replay store mutex poisoned".into()))?;
        Ok(db.exists(&digest))
    }

    pub fn insert(&self, b64_payload: &str) -> SpaResult<()> {
        let digest = fingerprint_hex(b64_payload);
        let mut db = self
            .db
            .lock()
            .map_err(|_| SpaError::InternalError("replay store mutex poisoned".into()))?;
        if let Err(e) = db.set(&digest, &true) {
            warn!(cause = %e, "failed to persist replay digest");
            return Err(SpaError::DigestError(format!("failed to persist digest: {e}")));
        }
        Ok(())
    }
}
