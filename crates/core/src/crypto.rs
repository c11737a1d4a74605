//! Curve25519 key helpers used to mint fresh credentials.
//!
//! Key pairs are X25519 (clamped private scalar, 32-byte public u-coordinate).
//! Signatures are XEdDSA over those same keys, which is what the signal
//! protocol expects for the signed pre-key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::montgomery::MontgomeryPoint;
use curve25519_dalek::scalar::{Scalar, clamp_integer};
use rand::RngCore as _;
use rand::rngs::OsRng;
use sha2::{Digest as _, Sha512};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::codec::Buffer;
use crate::creds::{AccountSettings, AuthenticationCreds, KeyPair, SignedKeyPair};
use crate::error::CryptoError;

/// Type byte prepended to public keys on the wire.
pub const SIGNAL_KEY_TYPE: u8 = 5;

pub const KEY_LEN: usize = 32;

pub const SIGNATURE_LEN: usize = 64;

const REGISTRATION_ID_MASK: u16 = 0x3FFF;

/// XEdDSA `hash_1` domain separator: 0xFE followed by 31 bytes of 0xFF.
const HASH1_PREFIX: [u8; 32] = {
    let mut prefix = [0xFF; 32];
    prefix[0] = 0xFE;
    prefix
};

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order_wide(&wide)
}

fn key_array(key: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    key.try_into()
        .map_err(|_| CryptoError::InvalidKeyLength { expected: KEY_LEN, actual: key.len() })
}

fn raw_key_pair() -> ([u8; KEY_LEN], [u8; KEY_LEN]) {
    let private = clamp_integer(random_bytes());
    let public = PublicKey::from(&StaticSecret::from(private));
    (private, public.to_bytes())
}

/// Generate a fresh Curve25519 key pair.
pub fn generate_key_pair() -> KeyPair {
    let (private, public) = raw_key_pair();
    KeyPair { public: Buffer::from(public), private: Buffer::from(private) }
}

/// Public key in wire form: 33 bytes with the type prefix.
#[must_use]
pub fn signal_public_key(public_key: &[u8]) -> Vec<u8> {
    if public_key.len() == KEY_LEN + 1 {
        return public_key.to_vec();
    }
    let mut prefixed = Vec::with_capacity(KEY_LEN + 1);
    prefixed.push(SIGNAL_KEY_TYPE);
    prefixed.extend_from_slice(public_key);
    prefixed
}

fn xeddsa_sign(private_key: &[u8; KEY_LEN], message: &[u8]) -> [u8; SIGNATURE_LEN] {
    let k = Scalar::from_bytes_mod_order(clamp_integer(*private_key));
    let edwards_public = EdwardsPoint::mul_base(&k);
    // The Montgomery key maps to the Edwards point with sign bit 0; flip the
    // scalar when the derived point has the other sign.
    let (a, big_a) = if edwards_public.compress().as_bytes()[31] & 0x80 == 0 {
        (k, edwards_public.compress())
    } else {
        (-k, (-edwards_public).compress())
    };

    let nonce: [u8; 64] = random_bytes();
    let r = hash_to_scalar(&[&HASH1_PREFIX[..], &a.as_bytes()[..], message, &nonce[..]]);
    let big_r = EdwardsPoint::mul_base(&r).compress();
    let h = hash_to_scalar(&[&big_r.as_bytes()[..], &big_a.as_bytes()[..], message]);
    let s = r + h * a;

    let mut signature = [0u8; SIGNATURE_LEN];
    signature[..KEY_LEN].copy_from_slice(big_r.as_bytes());
    signature[KEY_LEN..].copy_from_slice(s.as_bytes());
    signature
}

/// XEdDSA signature of `message` under a Curve25519 private key.
pub fn calculate_signature(
    private_key: &[u8],
    message: &[u8],
) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    Ok(xeddsa_sign(&key_array(private_key)?, message))
}

/// Check an XEdDSA signature. Accepts the public key with or without the
/// type prefix.
#[must_use]
pub fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let raw = match public_key {
        [SIGNAL_KEY_TYPE, rest @ ..] if rest.len() == KEY_LEN => rest,
        key if key.len() == KEY_LEN => key,
        _ => return false,
    };
    let (Ok(u), Ok(signature)) = (key_array(raw), <[u8; SIGNATURE_LEN]>::try_from(signature))
    else {
        return false;
    };
    let Some(big_a) = MontgomeryPoint(u).to_edwards(0) else {
        return false;
    };

    let mut r_bytes = [0u8; KEY_LEN];
    r_bytes.copy_from_slice(&signature[..KEY_LEN]);
    let mut s_bytes = [0u8; KEY_LEN];
    s_bytes.copy_from_slice(&signature[KEY_LEN..]);
    let Some(s) = Option::<Scalar>::from(Scalar::from_canonical_bytes(s_bytes)) else {
        return false;
    };

    let a_bytes = big_a.compress().to_bytes();
    let h = hash_to_scalar(&[&r_bytes[..], &a_bytes[..], message]);
    let r_check = EdwardsPoint::vartime_double_scalar_mul_basepoint(&(-h), &big_a, &s);
    r_check.compress().to_bytes() == r_bytes
}

fn signed_pre_key(identity_private: &[u8; KEY_LEN], key_id: u32) -> SignedKeyPair {
    let key_pair = generate_key_pair();
    let signature = xeddsa_sign(identity_private, &signal_public_key(&key_pair.public));
    SignedKeyPair { key_pair, signature: Buffer::from(signature), key_id, timestamp_s: None }
}

/// New pre-key signed by `identity`.
pub fn signed_key_pair(identity: &KeyPair, key_id: u32) -> Result<SignedKeyPair, CryptoError> {
    Ok(signed_pre_key(&key_array(&identity.private)?, key_id))
}

/// Random 14-bit registration id.
pub fn generate_registration_id() -> u16 {
    u16::from_le_bytes(random_bytes()) & REGISTRATION_ID_MASK
}

/// Fresh credentials for a device that has never paired.
pub fn init_auth_creds() -> AuthenticationCreds {
    let (identity_private, identity_public) = raw_key_pair();
    let signed_pre_key = signed_pre_key(&identity_private, 1);
    let adv_secret: [u8; 32] = random_bytes();

    AuthenticationCreds {
        noise_key: generate_key_pair(),
        pairing_ephemeral_key_pair: generate_key_pair(),
        signed_identity_key: KeyPair {
            public: Buffer::from(identity_public),
            private: Buffer::from(identity_private),
        },
        signed_pre_key,
        registration_id: generate_registration_id(),
        adv_secret_key: STANDARD.encode(adv_secret),
        me: None,
        account: None,
        signal_identities: None,
        my_app_state_key_id: None,
        first_unuploaded_pre_key_id: 1,
        next_pre_key_id: 1,
        last_account_sync_timestamp: None,
        platform: None,
        processed_history_messages: Vec::new(),
        account_sync_counter: 0,
        account_settings: AccountSettings { unarchive_chats: false, default_disappearing_mode: None },
        registered: false,
        pairing_code: None,
        last_prop_hash: None,
        routing_info: None,
        additional_data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pairs_are_clamped_curve25519() {
        let pair = generate_key_pair();
        assert_eq!(pair.public.len(), KEY_LEN);
        assert_eq!(pair.private.len(), KEY_LEN);
        assert_eq!(pair.private[0] & 0b111, 0);
        assert_eq!(pair.private[31] & 0x80, 0);
        assert_eq!(pair.private[31] & 0x40, 0x40);

        let secret = StaticSecret::from(key_array(&pair.private).unwrap());
        assert_eq!(&PublicKey::from(&secret).to_bytes()[..], &pair.public[..]);
    }

    #[test]
    fn signatures_verify_and_reject_tampering() {
        let pair = generate_key_pair();
        let message = b"pre-key public bytes";
        let signature = calculate_signature(&pair.private, message).unwrap();

        assert!(verify_signature(&pair.public, message, &signature));
        assert!(verify_signature(&signal_public_key(&pair.public), message, &signature));
        assert!(!verify_signature(&pair.public, b"other message", &signature));

        let mut tampered = signature;
        tampered[5] ^= 0x01;
        assert!(!verify_signature(&pair.public, message, &tampered));

        let stranger = generate_key_pair();
        assert!(!verify_signature(&stranger.public, message, &signature));
    }

    #[test]
    fn signing_rejects_short_keys() {
        assert_eq!(
            calculate_signature(&[1, 2, 3], b"msg"),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 3 })
        );
    }

    #[test]
    fn public_keys_get_a_type_prefix_once() {
        let raw = [9u8; 32];
        let prefixed = signal_public_key(&raw);
        assert_eq!(prefixed.len(), 33);
        assert_eq!(prefixed[0], SIGNAL_KEY_TYPE);
        assert_eq!(signal_public_key(&prefixed), prefixed);
    }

    #[test]
    fn registration_ids_fit_fourteen_bits() {
        for _ in 0..64 {
            assert!(generate_registration_id() <= REGISTRATION_ID_MASK);
        }
    }

    #[test]
    fn fresh_creds_are_unregistered_with_a_valid_signed_pre_key() {
        let creds = init_auth_creds();
        assert!(!creds.registered);
        assert_eq!(creds.next_pre_key_id, 1);
        assert_eq!(creds.first_unuploaded_pre_key_id, 1);
        assert_eq!(creds.account_sync_counter, 0);
        assert!(!creds.account_settings.unarchive_chats);
        assert_eq!(creds.signed_pre_key.key_id, 1);
        assert_eq!(STANDARD.decode(&creds.adv_secret_key).unwrap().len(), 32);
        assert!(verify_signature(
            &creds.signed_identity_key.public,
            &signal_public_key(&creds.signed_pre_key.key_pair.public),
            &creds.signed_pre_key.signature,
        ));
        assert_ne!(creds.noise_key, creds.pairing_ephemeral_key_pair);
    }

    #[test]
    fn signed_key_pair_uses_the_given_identity() {
        let identity = generate_key_pair();
        let signed = signed_key_pair(&identity, 7).unwrap();
        assert_eq!(signed.key_id, 7);
        assert!(verify_signature(
            &identity.public,
            &signal_public_key(&signed.key_pair.public),
            &signed.signature,
        ));
    }
}
