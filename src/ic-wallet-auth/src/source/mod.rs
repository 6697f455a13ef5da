//! The closed set of provider kinds and the tags persisted for them.
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod store;

pub use store::SourceStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Delegated identity through the primary identity service.
    DelegatedIdentityA,
    /// The same delegation protocol against a second identity service.
    DelegatedIdentityB,
    ExtensionWallet,
    DeepLinkWallet,
    PasskeyWallet,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::DelegatedIdentityA,
        Source::DelegatedIdentityB,
        Source::ExtensionWallet,
        Source::DeepLinkWallet,
        Source::PasskeyWallet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::DelegatedIdentityA => "DelegatedIdentityA",
            Source::DelegatedIdentityB => "DelegatedIdentityB",
            Source::ExtensionWallet => "ExtensionWallet",
            Source::DeepLinkWallet => "DeepLinkWallet",
            Source::PasskeyWallet => "PasskeyWallet",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Source> {
        Source::ALL.into_iter().find(|source| source.as_str() == tag)
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value read from durable storage.
///
/// Storage may hold a tag written by another build of the application, so an
/// unknown value is kept verbatim rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceTag {
    Known(Source),
    Unrecognized(String),
}

impl SourceTag {
    pub fn known(&self) -> Option<Source> {
        match self {
            SourceTag::Known(source) => Some(*source),
            SourceTag::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceTag::Known(source) => source.as_str(),
            SourceTag::Unrecognized(tag) => tag,
        }
    }

    /// Interprets a persisted value; never fails.
    pub fn from_stored(value: &str) -> SourceTag {
        match Source::from_tag(value) {
            Some(source) => SourceTag::Known(source),
            None => SourceTag::Unrecognized(value.to_string()),
        }
    }

    pub fn is(&self, source: Source) -> bool {
        self.known() == Some(source)
    }
}

impl From<Source> for SourceTag {
    fn from(source: Source) -> Self {
        SourceTag::Known(source)
    }
}

impl FromStr for SourceTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SourceTag::from_stored(s))
    }
}

impl Display for SourceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
