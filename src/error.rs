// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Error taxonomy for the SPA ingestion and authorization pipeline.
//!
//! None of these variants is ever surfaced to the packet's sender; the
//! pipeline's only externally observable failure mode is inaction. Every
//! error that reaches the Orchestrator is logged with source IP, stanza
//! number, and cause, then the current packet (or stanza attempt) is
//! dropped.

use thiserror::Error;

/// Errors produced while ingesting and authorizing a single SPA datagram.
#[derive(Debug, Error)]
pub enum SpaError {
    /// Structural malformation: length, known-prefix, or base64 check
    /// failed.
    #[error("bad data: {0}")]
    BadData(String),

    /// Syntactically legal but not ours (zero/undecodable identity,
    /// unrecognized wire shape).
    #[error("not SPA data: {0}")]
    NotSpaData(String),

    /// Digest computation or persistence failed.
    #[error("digest error: {0}")]
    DigestError(String),

    /// Crypto library context initialization failed for a non-user-caused
    /// reason.
    #[error("crypto context error: {0}")]
    FkoCtxError(String),

    /// Wrong key or tampered ciphertext for this stanza; classic mode
    /// keeps searching other stanzas.
    #[error("decrypt failure: {0}")]
    DecryptFailure(String),

    /// Validation rule failed (message type, timestamp, source, username,
    /// scope).
    #[error("policy reject: {0}")]
    PolicyReject(String),

    /// External command ran but returned a nonzero exit code / abnormal
    /// termination.
    #[error("command error: {0}")]
    CommandError(String),

    /// Allocation failure, lock poisoning, or other internal fault.
    #[error("internal error: {0}")]
    InternalError(String),
}

pub type SpaResult<T> = Result<T, SpaError>;
