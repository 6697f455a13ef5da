use crate::error::account::ParseAccountIdentifierError;
use candid::Principal;
use sha2::{Digest, Sha224};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const ACCOUNT_DOMAIN_SEPARATOR: &[u8] = b"\x0Aaccount-id";

/// Ledger address of a principal's subaccount.
///
/// Rendered as 64 hex characters: a big-endian CRC-32 of the hash followed by
/// the 28-byte SHA-224 of the owner and subaccount.
#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccountIdentifier {
    hash: [u8; 28],
}

impl AccountIdentifier {
    pub fn new(owner: &Principal, subaccount: Option<Subaccount>) -> Self {
        let subaccount = subaccount.unwrap_or_default();
        let digest = Sha224::new()
            .chain_update(ACCOUNT_DOMAIN_SEPARATOR)
            .chain_update(owner.as_slice())
            .chain_update(subaccount.0)
            .finalize();
        let mut hash = [0u8; 28];
        hash.copy_from_slice(&digest);
        Self { hash }
    }

    pub fn hash(&self) -> &[u8; 28] {
        &self.hash
    }

    pub fn checksum(&self) -> [u8; 4] {
        crc32fast::hash(&self.hash).to_be_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&self.checksum());
        bytes[4..].copy_from_slice(&self.hash);
        bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl Display for AccountIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for AccountIdentifier {
    type Err = ParseAccountIdentifierError;

    /// Accepts either hex case; the checksum must match.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(text)?;
        if bytes.len() != 32 {
            return Err(ParseAccountIdentifierError::WrongLength(bytes.len()));
        }
        let mut hash = [0u8; 28];
        hash.copy_from_slice(&bytes[4..]);
        let parsed = Self { hash };
        if parsed.checksum()[..] != bytes[..4] {
            return Err(ParseAccountIdentifierError::ChecksumMismatch {
                expected: hex::encode(parsed.checksum()),
                found: hex::encode(&bytes[..4]),
            });
        }
        Ok(parsed)
    }
}

/// An arbitrary 32-byte subaccount.
#[derive(Clone, Copy, Hash, Debug, Default, PartialEq, Eq)]
pub struct Subaccount(pub [u8; 32]);

impl Subaccount {
    /// The numbered subaccount wallets enumerate: the index big-endian in the
    /// last four bytes, zeros elsewhere.
    pub fn from_index(index: u32) -> Subaccount {
        let mut bytes = [0u8; 32];
        bytes[28..].copy_from_slice(&index.to_be_bytes());
        Subaccount(bytes)
    }
}
