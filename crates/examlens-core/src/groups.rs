//! Subject-keyed grouping that keeps first-appearance order.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Items bucketed by subject. Subjects appear in the order they were first
/// seen and items keep their insertion order within a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectGroups<T> {
    groups: Vec<(String, Vec<T>)>,
}

impl<T> Default for SubjectGroups<T> {
    fn default() -> Self {
        Self { groups: Vec::new() }
    }
}

impl<T> SubjectGroups<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subject: &str, item: T) {
        match self.groups.iter_mut().find(|(s, _)| s == subject) {
            Some((_, items)) => items.push(item),
            None => self.groups.push((subject.to_string(), vec![item])),
        }
    }

    pub fn get(&self, subject: &str) -> Option<&[T]> {
        self.groups
            .iter()
            .find(|(s, _)| s == subject)
            .map(|(_, items)| items.as_slice())
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(s, _)| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.groups.iter().map(|(s, items)| (s.as_str(), items.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of subjects.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Number of items across all subjects.
    pub fn total(&self) -> usize {
        self.groups.iter().map(|(_, items)| items.len()).sum()
    }
}

impl<T> FromIterator<(String, T)> for SubjectGroups<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut groups = SubjectGroups::new();
        for (subject, item) in iter {
            groups.push(&subject, item);
        }
        groups
    }
}

impl<T: Serialize> Serialize for SubjectGroups<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (subject, items) in &self.groups {
            map.serialize_entry(subject, items)?;
        }
        map.end()
    }
}
