// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Packet Preprocessor (C1): cheap structural validation, HTTP-tunnel
//! unwrapping, and identity extraction.

pub mod preprocessor;
pub mod types;

pub use preprocessor::preprocess;
pub use types::{NormalizedPacket, Packet};
