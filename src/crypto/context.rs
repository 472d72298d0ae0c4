// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{error::SpaResult, message::DecodedMessage};

/// Opaque capability over one decryption attempt's lifetime.
///
/// Modeled as a scoped, owning handle (spec §9 Design Notes): dropping it
/// releases and zeroes any key material it holds, so callers never carry a
/// destroy obligation. `Drop` impls on the concrete types below log a
/// warning on a zero-out failure instead of propagating it — the loop that
/// tries the next stanza must never abort because cleanup was imperfect.
pub trait CryptoContext: Send {
    /// Attempts decryption and, on success, parses the plaintext into a
    /// [`DecodedMessage`] plus the GPG signer identity when applicable.
    fn decrypt(&mut self) -> SpaResult<DecodedMessage>;

    /// GPG signer id pulled from the context after a successful GPG
    /// decrypt; `None` for the symmetric path or before decryption runs.
    fn gpg_signature_id(&self) -> Option<&str> {
        None
    }

    fn gpg_signature_fpr(&self) -> Option<&str> {
        None
    }
}
