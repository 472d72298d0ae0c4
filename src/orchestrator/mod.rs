// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Pipeline Orchestrator (C7): drives one datagram through preprocessing,
//! replay screening, policy candidate selection, and per-stanza
//! decryption/validation/dispatch, stopping at the first accepted stanza.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::{debug, warn};

use crate::{
    cfg::config::Config,
    crypto::{DecryptOutcome, decrypt_with_stanza},
    dispatch::{self, DispatchOutcome, LoggingFirewall},
    packet::{self, Packet},
    policy::PolicySet,
    replay::ReplayStore,
    validator::{self, Verdict},
};

/// Terminal outcome of running one datagram through the full pipeline,
/// reported for observability; the pipeline itself never replies to the
/// sender regardless of outcome.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// A stanza accepted the request and C6 dispatched it.
    Dispatched(DispatchOutcome),
    /// The packet failed preprocessing or was already replayed.
    Dropped(&'static str),
    /// No candidate stanza accepted the request.
    NoMatch,
}

/// Owns the long-lived collaborators a packet is run against: the policy
/// set (swappable behind a reload), the replay store, and the firewall
/// actuator.
pub struct Orchestrator {
    config: Config,
    policy: Arc<PolicySet>,
    replay: ReplayStore,
    firewall: LoggingFirewall,
    test_mode: bool,
}

impl Orchestrator {
    pub fn new(config: Config, policy: Arc<PolicySet>, replay: ReplayStore, test_mode: bool) -> Self {
        Orchestrator {
            config,
            policy,
            replay,
            firewall: LoggingFirewall,
            test_mode,
        }
    }

    pub fn policy(&self) -> &Arc<PolicySet> {
        &self.policy
    }

    /// Runs one packet through C1 -> C7.
    pub async fn handle_packet(&self, packet: Packet) -> PipelineOutcome {
        let normalized = match packet::preprocess(&packet, self.config.spa.spa_over_http(), self.config.spa.sdp_mode()) {
            Ok(n) => n,
            Err(e) => {
                debug!(src_ip = %packet.src_ip, error = %e, "packet rejected at preprocessing");
                return PipelineOutcome::Dropped("preprocess");
            },
        };

        if self.config.spa.digest_persistence() {
            match self.replay.contains(&normalized.b64_payload) {
                Ok(true) => {
                    debug!(src_ip = %normalized.src_ip, "packet rejected: replay");
                    return PipelineOutcome::Dropped("replay");
                },
                Err(e) => {
                    warn!(src_ip = %normalized.src_ip, error = %e, "replay store lookup failed, processing anyway");
                },
                Ok(false) => {},
            }
        }

        let now = now_secs();
        let has_identity = normalized.identity_numeric.is_some();

        if self.policy.is_identity_mode() {
            let Some(identity_text) = &normalized.identity_text else {
                return PipelineOutcome::Dropped("missing identity");
            };
            let Some(stanza) = self.policy.lookup_by_identity(identity_text) else {
                debug!(identity = %identity_text, "no stanza for client identity");
                return PipelineOutcome::Dropped("unknown identity");
            };

            return self
                .try_stanza(
                    &stanza,
                    &normalized.b64_payload,
                    has_identity,
                    normalized.src_ip,
                    normalized.dst_ip,
                    now,
                    true,
                )
                .await
                .unwrap_or(PipelineOutcome::NoMatch);
        }

        for stanza in self.policy.classic_candidates(normalized.src_ip) {
            if let Some(outcome) = self
                .try_stanza(
                    &stanza,
                    &normalized.b64_payload,
                    has_identity,
                    normalized.src_ip,
                    normalized.dst_ip,
                    now,
                    false,
                )
                .await
            {
                return outcome;
            }
        }

        PipelineOutcome::NoMatch
    }

    /// Attempts one candidate stanza: decrypt, validate, dispatch.
    /// Returns `None` when the orchestrator should keep searching other
    /// stanzas (classic mode only; identity mode always gets `Some`).
    async fn try_stanza(
        &self,
        stanza: &Arc<crate::policy::AccessStanza>,
        b64_payload: &str,
        has_identity: bool,
        src_ip: std::net::Ipv4Addr,
        dst_ip: std::net::Ipv4Addr,
        now: i64,
        identity_mode: bool,
    ) -> Option<PipelineOutcome> {
        if stanza.is_expired() {
            return if identity_mode { Some(PipelineOutcome::Dropped("expired")) } else { None };
        }

        let decoded = match decrypt_with_stanza(stanza, b64_payload, has_identity).await {
            DecryptOutcome::Accepted(decoded) => decoded,
            DecryptOutcome::NotAttempted => {
                return if identity_mode { Some(PipelineOutcome::Dropped("no usable credentials")) } else { None };
            },
            DecryptOutcome::Failed => {
                return if identity_mode { Some(PipelineOutcome::Dropped("decrypt failure")) } else { None };
            },
        };

        match validator::validate(stanza, decoded, src_ip, dst_ip, &self.config.spa, now, identity_mode) {
            Verdict::Accept(stanza, decoded) => {
                if !self.test_mode && self.config.spa.digest_persistence() {
                    if let Err(e) = self.replay.insert(b64_payload) {
                        warn!(stanza = stanza.stanza_num, error = %e, "failed to persist replay digest");
                    }
                }
                let outcome = dispatch::dispatch(&stanza, &decoded, &self.config.spa, &self.firewall, self.test_mode).await;
                Some(PipelineOutcome::Dispatched(outcome))
            },
            Verdict::StopSearching(reason) => {
                debug!(stanza = stanza.stanza_num, reason = %reason, "stopping search for this packet");
                Some(PipelineOutcome::Dropped("policy reject"))
            },
            Verdict::KeepSearching => {
                if identity_mode {
                    Some(PipelineOutcome::NoMatch)
                } else {
                    None
                }
            },
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
