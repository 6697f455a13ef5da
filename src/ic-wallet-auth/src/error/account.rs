use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseAccountIdentifierError {
    #[error("Account identifier is not valid hex")]
    NotHex(#[from] hex::FromHexError),

    #[error("Account identifier must be 32 bytes, found {0}")]
    WrongLength(usize),

    #[error("Account identifier checksum is {found}, expected {expected}")]
    ChecksumMismatch { expected: String, found: String },
}
