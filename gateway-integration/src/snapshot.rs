use std::ops::Deref;

/// Wraps a value that represents a point-in-time snapshot rather than an
/// incremental update, so callers can pattern-match on the distinction
/// without re-deriving it from context (used by `AccountEvent::Snapshot`
/// and venue orderbook snapshot frames, spec §4.F/§4.K).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T>(pub T);

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<T> for Snapshot<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}
