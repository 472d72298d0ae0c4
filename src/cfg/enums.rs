// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Boolean enumeration with string serialization support
///
/// Represents yes/no values with support for various string representations
/// including "Y"/"N", "true"/"false", and the original wire spellings.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    #[serde(
        rename = "Y",
        alias = "y",
        alias = "Yes",
        alias = "yes",
        alias = "true",
        alias = "True"
    )]
    Yes,
    #[serde(
        rename = "N",
        alias = "n",
        alias = "No",
        alias = "no",
        alias = "false",
        alias = "False"
    )]
    No,
}
impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YesNo::Yes => "Y",
            YesNo::No => "N",
        })
    }
}
impl From<bool> for YesNo {
    fn from(b: bool) -> Self {
        if b { YesNo::Yes } else { YesNo::No }
    }
}
impl YesNo {
    pub fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

/// Symmetric encryption mode carried by a stanza's credentials.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMode {
    /// CBC with a random IV prefixed to the ciphertext.
    #[default]
    #[serde(rename = "CBC")]
    Cbc,
    /// Legacy mode kept for stanza-file compatibility; rejected at decrypt
    /// time.
    #[serde(rename = "Legacy")]
    Legacy,
}

/// HMAC digest selection for stanza credentials.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HmacType {
    #[serde(rename = "SHA1")]
    Sha1,
    #[default]
    #[serde(rename = "SHA256")]
    Sha256,
    #[serde(rename = "SHA384")]
    Sha384,
    #[serde(rename = "SHA512")]
    Sha512,
}
impl fmt::Display for HmacType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HmacType::Sha1 => "SHA1",
            HmacType::Sha256 => "SHA256",
            HmacType::Sha384 => "SHA384",
            HmacType::Sha512 => "SHA512",
        })
    }
}

/// Digest algorithm used by the replay cache.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgo {
    #[default]
    #[serde(rename = "SHA256")]
    Sha256,
}

/// Encryption family sniffed from the leading bytes of a decoded message,
/// independent of any stanza's configured [`EncryptionMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    Rijndael,
    Gpg,
    Unknown,
}

impl EncryptionType {
    /// Sniffs the encryption family from the leading byte of a base64-
    /// decoded payload (identity prefix already stripped). OpenPGP packets
    /// (RFC 4880 §4.2) always set the high bit of their first byte; our own
    /// Rijndael envelope opens with a random IV byte, so an unset high bit
    /// is the common case there.
    pub fn detect(raw: &[u8]) -> EncryptionType {
        match raw.first() {
            Some(b) if b & 0x80 != 0 => EncryptionType::Gpg,
            Some(_) => EncryptionType::Rijndael,
            None => EncryptionType::Unknown,
        }
    }
}
