// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Crypto Dispatcher (C4): symmetric and asymmetric decryption paths,
//! selected per-stanza by [`dispatch::decrypt_with_stanza`].

pub mod context;
pub mod dispatch;
pub mod encoding;
pub mod gpg;
pub mod rijndael;

pub use context::CryptoContext;
pub use dispatch::{DecryptOutcome, decrypt_with_stanza};
