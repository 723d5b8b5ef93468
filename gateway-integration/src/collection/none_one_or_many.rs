use serde::{Deserialize, Serialize};

/// Zero, one, or many items — unlike [`super::OneOrMany`], the empty case is
/// representable. Used for things like "the TWAP slice list for a
/// sub-minimum, non-reduce-only order" (spec §4.M example: `[]`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoneOneOrMany<T>(Vec<T>);

impl<T> NoneOneOrMany<T> {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn one(item: T) -> Self {
        Self(vec![item])
    }

    pub fn many(items: Vec<T>) -> Self {
        Self(items)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> From<Vec<T>> for NoneOneOrMany<T> {
    fn from(value: Vec<T>) -> Self {
        Self(value)
    }
}

impl<T> IntoIterator for NoneOneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_empty() {
        let none: NoneOneOrMany<i32> = NoneOneOrMany::none();
        assert!(none.is_empty());
        assert_eq!(none.len(), 0);
    }

    #[test]
    fn many_preserves_order() {
        let many = NoneOneOrMany::many(vec![1, 2, 3]);
        assert_eq!(many.into_vec(), vec![1, 2, 3]);
    }
}
