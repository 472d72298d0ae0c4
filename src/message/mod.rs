// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Decoded SPA message types, populated by the Crypto Dispatcher (C4) and
//! consumed by the Message Validator (C5).

pub mod decoded;

pub use decoded::{DecodedMessage, MessageType};
