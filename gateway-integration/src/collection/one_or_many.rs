use serde::{Deserialize, Serialize};

/// Either exactly one `T`, or several — never empty. Used for the EMS batch
/// submit path (spec §4.M `create_batch_orders`), which always carries at
/// least one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(value: Vec<T>) -> Self {
        OneOrMany::Many(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_has_len_one() {
        let one = OneOrMany::from(5);
        assert_eq!(one.len(), 1);
        assert_eq!(one.into_vec(), vec![5]);
    }

    #[test]
    fn many_preserves_order() {
        let many: OneOrMany<i32> = vec![1, 2, 3].into();
        assert_eq!(many.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
