// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use super::stanza::AccessStanza;

/// Two lookup strategies over the access-policy set, selected once at
/// startup by `DisableSdpMode` (C3).
///
/// Stanzas are owned here; per-packet code only ever holds an `Arc` clone,
/// so nothing outlives a reload swap of the whole `PolicySet`.
pub enum PolicySet {
    /// Linear scan over the ordered stanza list (insertion order).
    Classic(Vec<Arc<AccessStanza>>),
    /// Hash lookup by client-supplied identity, under a concurrent map
    /// whose lock scope is the single lookup (teacher's `dashmap`-backed
    /// session pool pattern).
    Identity(DashMap<String, Arc<AccessStanza>>),
}

impl PolicySet {
    pub fn classic(stanzas: Vec<AccessStanza>) -> Self {
        PolicySet::Classic(stanzas.into_iter().map(Arc::new).collect())
    }

    pub fn identity(stanzas: Vec<AccessStanza>) -> Self {
        let map = DashMap::with_capacity(stanzas.len());
        for stanza in stanzas {
            let Some(identity) = stanza.identity.clone() else {
                warn!(stanza_num = stanza.stanza_num, "identity-mode stanza missing an identity key, skipping");
                continue;
            };
            map.insert(identity, Arc::new(stanza));
        }
        PolicySet::Identity(map)
    }

    /// Classic-mode candidate sequence, coarse-filtered by source address
    /// only (C3): membership of `src_ip` in a stanza's `source_list`.
    /// Finer src/dst checks repeat inside C5.
    pub fn classic_candidates(&self, src_ip: std::net::Ipv4Addr) -> Vec<Arc<AccessStanza>> {
        match self {
            PolicySet::Classic(stanzas) => stanzas
                .iter()
                .filter(|s| s.source_matches(src_ip))
                .cloned()
                .collect(),
            PolicySet::Identity(_) => Vec::new(),
        }
    }

    /// Single hash lookup by identity text (C3 identity mode). A miss is a
    /// hard reject, never upgraded to a classic scan.
    pub fn lookup_by_identity(&self, identity_text: &str) -> Option<Arc<AccessStanza>> {
        match self {
            PolicySet::Identity(map) => map.get(identity_text).map(|e| Arc::clone(e.value())),
            PolicySet::Classic(_) => None,
        }
    }

    pub fn is_identity_mode(&self) -> bool {
        matches!(self, PolicySet::Identity(_))
    }
}
