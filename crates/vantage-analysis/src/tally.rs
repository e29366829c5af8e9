//! Frequency counting with a deterministic tie-break.

use std::collections::HashMap;
use std::hash::Hash;

/// Counts values while remembering the order they were first seen.
#[derive(Debug, Clone)]
pub struct Tally<T> {
    order: Vec<(T, usize)>,
    index: HashMap<T, usize>,
}

impl<T> Default for Tally<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> Tally<T> {
    /// Empty tally
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence
    pub fn add(&mut self, value: T) {
        if let Some(&slot) = self.index.get(&value) {
            self.order[slot].1 += 1;
        } else {
            self.index.insert(value.clone(), self.order.len());
            self.order.push((value, 1));
        }
    }

    /// Most frequent value; among equal counts the first one seen wins
    #[must_use]
    pub fn most_common(&self) -> Option<&T> {
        let mut best: Option<&(T, usize)> = None;
        for entry in &self.order {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(value, _)| value)
    }

    /// Values by descending count, ties in first-seen order
    #[must_use]
    pub fn ranked(&self) -> Vec<(T, usize)> {
        let mut ranked = self.order.clone();
        // sort_by is stable, so first-seen order survives among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Number of values counted
    #[must_use]
    pub fn total(&self) -> usize {
        self.order.iter().map(|(_, n)| n).sum()
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for Tally<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tally = Self::new();
        for value in iter {
            tally.add(value);
        }
        tally
    }
}

/// Most frequent non-null value of an iterator
pub fn most_common<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = Option<T>>,
{
    values
        .into_iter()
        .flatten()
        .collect::<Tally<T>>()
        .most_common()
        .cloned()
}
