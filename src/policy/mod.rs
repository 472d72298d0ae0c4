// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Policy Index (C3): classic (IP-indexed linear scan) and identity (hash
//! lookup) access-policy strategies, plus the scope-policy ACLs consumed
//! by the Message Validator (C5 step 10).

pub mod index;
pub mod loader;
pub mod service_acl;
pub mod stanza;

pub use index::PolicySet;
pub use stanza::AccessStanza;
