// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{index::PolicySet, stanza::AccessStanzaDef};

#[derive(Deserialize)]
struct AccessFile {
    stanzas: Vec<AccessStanzaDef>,
}

/// Loads the access-policy stanza file and builds the [`PolicySet`] for the
/// configured mode. Called once at startup; a reload re-runs this and
/// atomically swaps the returned value in behind an `Arc`.
pub fn load_policy<P: AsRef<Path>>(path: P, identity_mode: bool) -> Result<PolicySet> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read access policy file {:?}", path.as_ref()))?;
    let file: AccessFile =
        serde_yaml::from_str(&text).context("failed to parse access policy YAML")?;

    let stanzas = file
        .stanzas
        .into_iter()
        .enumerate()
        .map(|(i, def)| def.into_runtime(i + 1))
        .collect::<Result<Vec<_>>>()?;

    Ok(if identity_mode {
        PolicySet::identity(stanzas)
    } else {
        PolicySet::classic(stanzas)
    })
}
