use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// A currency/coin identifier (e.g. `USDT`, `BTC`), normalised upper-case.
///
/// Kept as a thin newtype over `String` rather than a `SmolStr` interned
/// table: assets are few and long-lived relative to instruments, so the
/// allocation cost is immaterial next to the type-safety win of not mixing
/// up an asset with an arbitrary string.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Constructor, Serialize, Deserialize,
)]
pub struct AssetId(String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_uppercase())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value.to_uppercase())
    }
}
