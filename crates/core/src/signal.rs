//! Key-store entry kinds and their typed values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{self, Buffer};
use crate::creds::KeyPair;
use crate::error::CodecError;
use crate::sync_key::{AppStateSyncKey, decode_app_state_sync_key};

/// Kind of key-store entry. The kebab-case name prefixes the stored identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalDataType {
    Session,
    PreKey,
    SenderKey,
    SenderKeyMemory,
    AppStateSyncKey,
    AppStateSyncVersion,
    LidMapping,
    DeviceList,
}

impl SignalDataType {
    pub const ALL: &'static [SignalDataType] = &[
        Self::Session,
        Self::PreKey,
        Self::SenderKey,
        Self::SenderKeyMemory,
        Self::AppStateSyncKey,
        Self::AppStateSyncVersion,
        Self::LidMapping,
        Self::DeviceList,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Session => "session",
            Self::PreKey => "pre-key",
            Self::SenderKey => "sender-key",
            Self::SenderKeyMemory => "sender-key-memory",
            Self::AppStateSyncKey => "app-state-sync-key",
            Self::AppStateSyncVersion => "app-state-sync-version",
            Self::LidMapping => "lid-mapping",
            Self::DeviceList => "device-list",
        }
    }

    /// Stored identifier of entry `id` of this kind: `"<type>_<id>"`.
    #[must_use]
    pub fn identifier(&self, id: &str) -> String {
        format!("{}_{id}", self.as_str())
    }
}

impl fmt::Display for SignalDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalDataType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CodecError::invalid("type", format!("unknown key-store type: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueMac {
    pub value_mac: Buffer,
}

/// LT-hash state of one app-state collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LtHashState {
    pub version: u64,
    pub hash: Buffer,
    #[serde(default)]
    pub index_value_map: BTreeMap<String, ValueMac>,
}

/// A key-store value; the variant is fixed by its [`SignalDataType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    Session(Buffer),
    PreKey(KeyPair),
    SenderKey(Buffer),
    SenderKeyMemory(BTreeMap<String, bool>),
    AppStateSyncKey(AppStateSyncKey),
    AppStateSyncVersion(LtHashState),
    LidMapping(String),
    DeviceList(Vec<String>),
}

impl SignalValue {
    #[must_use]
    pub const fn data_type(&self) -> SignalDataType {
        match *self {
            Self::Session(_) => SignalDataType::Session,
            Self::PreKey(_) => SignalDataType::PreKey,
            Self::SenderKey(_) => SignalDataType::SenderKey,
            Self::SenderKeyMemory(_) => SignalDataType::SenderKeyMemory,
            Self::AppStateSyncKey(_) => SignalDataType::AppStateSyncKey,
            Self::AppStateSyncVersion(_) => SignalDataType::AppStateSyncVersion,
            Self::LidMapping(_) => SignalDataType::LidMapping,
            Self::DeviceList(_) => SignalDataType::DeviceList,
        }
    }

    /// Decode stored text as a value of `kind`. Sync keys go through
    /// [`decode_app_state_sync_key`] to normalize their loose wire form.
    pub fn decode(kind: SignalDataType, text: &str) -> Result<Self, CodecError> {
        Ok(match kind {
            SignalDataType::Session => Self::Session(codec::deserialize(text)?),
            SignalDataType::PreKey => Self::PreKey(codec::deserialize(text)?),
            SignalDataType::SenderKey => Self::SenderKey(codec::deserialize(text)?),
            SignalDataType::SenderKeyMemory => Self::SenderKeyMemory(codec::deserialize(text)?),
            SignalDataType::AppStateSyncKey => {
                Self::AppStateSyncKey(decode_app_state_sync_key(codec::deserialize(text)?)?)
            },
            SignalDataType::AppStateSyncVersion => {
                Self::AppStateSyncVersion(codec::deserialize(text)?)
            },
            SignalDataType::LidMapping => Self::LidMapping(codec::deserialize(text)?),
            SignalDataType::DeviceList => Self::DeviceList(codec::deserialize(text)?),
        })
    }
}

/// Batch of key-store writes; `None` deletes the entry.
pub type SignalDataSet = BTreeMap<SignalDataType, BTreeMap<String, Option<SignalValue>>>;
