//! Ethereum personal-message (EIP-191) signature verification
//!
//! Signatures produced by standard wallet tooling sign the prefixed hash of
//! the message, so recovery here matches `personal_sign` output. Everything
//! fails closed: malformed input is never a valid signature.

use alloy::primitives::{Address, Signature};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("invalid signature encoding: {0}")]
    Encoding(String),

    #[error("invalid signature length: got {0} bytes, want 65")]
    Length(usize),

    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

/// Recover the signer address of an EIP-191 personal message.
///
/// Accepts 65-byte r||s||v signatures with v in {0, 1, 27, 28}.
pub fn recover(message: &str, signature_hex: &str) -> Result<Address, SignatureError> {
    let raw = hex::decode(signature_hex.trim_start_matches("0x"))
        .map_err(|e| SignatureError::Encoding(e.to_string()))?;

    if raw.len() != 65 {
        return Err(SignatureError::Length(raw.len()));
    }

    let signature =
        Signature::from_raw(&raw).map_err(|e| SignatureError::Encoding(e.to_string()))?;

    signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| SignatureError::Recovery(e.to_string()))
}

/// True only when `signature_hex` recovers exactly to `address`.
pub fn verify(address: Address, message: &str, signature_hex: &str) -> bool {
    matches!(recover(message, signature_hex), Ok(recovered) if recovered == address)
}

/// Canonical storage/comparison form: lowercase hex with 0x prefix.
pub fn canonical(address: Address) -> String {
    format!("{address:#x}")
}

/// Checksummed display form.
pub fn display(address: Address) -> String {
    address.to_checksum(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};

    fn sign(signer: &PrivateKeySigner, message: &str) -> String {
        let sig = signer.sign_message_sync(message.as_bytes()).unwrap();
        format!("0x{}", hex::encode(sig.as_bytes()))
    }

    #[test]
    fn recovers_the_signing_address() {
        let signer = PrivateKeySigner::random();
        let message = "Sign in to OracleNet\n\nNonce: a1b2c3d4\nTimestamp: 2026-01-01T00:00:00Z";
        let signature = sign(&signer, message);

        let recovered = recover(message, &signature).unwrap();
        assert_eq!(recovered, signer.address());
        assert!(verify(signer.address(), message, &signature));
    }

    #[test]
    fn wrong_key_never_verifies() {
        let signer = PrivateKeySigner::random();
        let other = PrivateKeySigner::random();
        let message = "arbitrary message content";
        let signature = sign(&other, message);

        assert!(!verify(signer.address(), message, &signature));
    }

    #[test]
    fn different_message_recovers_different_address() {
        let signer = PrivateKeySigner::random();
        let signature = sign(&signer, "message one");

        let recovered = recover("message two", &signature).unwrap();
        assert_ne!(recovered, signer.address());
    }

    #[test]
    fn malformed_signatures_fail_closed() {
        let addr = PrivateKeySigner::random().address();

        assert!(matches!(
            recover("msg", "0xzznotahex"),
            Err(SignatureError::Encoding(_))
        ));
        assert!(matches!(
            recover("msg", "0xdeadbeef"),
            Err(SignatureError::Length(4))
        ));
        assert!(!verify(addr, "msg", ""));
    }

    #[test]
    fn canonical_form_is_lowercase() {
        let addr: Address = "0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266"
            .parse()
            .unwrap();
        assert_eq!(canonical(addr), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        assert_eq!(display(addr), "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    }
}
