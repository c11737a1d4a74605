//! Long-lived credentials of a multi-device session.
//!
//! Field names follow the protocol library's JSON so a row written by any
//! client of the shared table decodes here unchanged.

use serde::{Deserialize, Serialize};

use crate::codec::Buffer;
use crate::sync_key::lenient_timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub public: Buffer,
    pub private: Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedKeyPair {
    pub key_pair: KeyPair,
    pub signature: Buffer,
    pub key_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_s: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolAddress {
    pub name: String,
    pub device_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalIdentity {
    pub identifier: ProtocolAddress,
    pub identifier_key: Buffer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeDetails {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Signed device identity issued at pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Buffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_signature_key: Option<Buffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_signature: Option<Buffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_signature: Option<Buffer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_jid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_me: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalMessage {
    pub key: MessageKey,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_expiration: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub ephemeral_setting_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub unarchive_chats: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_disappearing_mode: Option<Conversation>,
}

/// Everything the protocol library keeps across restarts besides the key store.
///
/// Created once by [`crate::crypto::init_auth_creds`], then mutated by the
/// caller and persisted on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationCreds {
    pub noise_key: KeyPair,
    pub pairing_ephemeral_key_pair: KeyPair,
    pub signed_identity_key: KeyPair,
    pub signed_pre_key: SignedKeyPair,
    pub registration_id: u16,
    pub adv_secret_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub me: Option<MeDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_identities: Option<Vec<SignalIdentity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_app_state_key_id: Option<String>,
    pub first_unuploaded_pre_key_id: u32,
    pub next_pre_key_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_account_sync_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default)]
    pub processed_history_messages: Vec<MinimalMessage>,
    pub account_sync_counter: u32,
    #[serde(default)]
    pub account_settings: AccountSettings,
    pub registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_prop_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_info: Option<Buffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec;

    #[test]
    fn decodes_creds_written_by_other_clients() {
        let stored = json!({
            "noiseKey": {"private": {"type": "Buffer", "data": "AQ=="}, "public": {"type": "Buffer", "data": [2]}},
            "pairingEphemeralKeyPair": {"private": {"type": "Buffer", "data": "Aw=="}, "public": {"type": "Buffer", "data": "BA=="}},
            "signedIdentityKey": {"private": {"type": "Buffer", "data": "BQ=="}, "public": {"type": "Buffer", "data": "Bg=="}},
            "signedPreKey": {
                "keyPair": {"private": {"type": "Buffer", "data": "Bw=="}, "public": {"type": "Buffer", "data": "CA=="}},
                "signature": {"type": "Buffer", "data": "CQ=="},
                "keyId": 1
            },
            "registrationId": 1234,
            "advSecretKey": "c2VjcmV0",
            "processedHistoryMessages": [
                {"key": {"remoteJid": "123@s.whatsapp.net", "fromMe": true, "id": "ABC"}, "messageTimestamp": "1700000000"}
            ],
            "nextPreKeyId": 31,
            "firstUnuploadedPreKeyId": 31,
            "accountSyncCounter": 2,
            "accountSettings": {"unarchiveChats": false},
            "registered": true,
            "me": {"id": "123:4@s.whatsapp.net", "name": "someone"},
            "additionalData": {"anything": [1, 2]}
        });
        let creds: AuthenticationCreds = codec::deserialize(&stored.to_string()).unwrap();
        assert_eq!(creds.noise_key.public.0, vec![2]);
        assert_eq!(creds.registration_id, 1234);
        assert_eq!(creds.processed_history_messages[0].message_timestamp, Some(1_700_000_000));
        assert_eq!(creds.me.as_ref().map(|m| m.name.as_deref()), Some(Some("someone")));
        assert!(creds.registered);
        assert!(creds.routing_info.is_none());

        let again: AuthenticationCreds =
            codec::deserialize(&codec::serialize(&creds).unwrap()).unwrap();
        assert_eq!(again, creds);
    }
}
