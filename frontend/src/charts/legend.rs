use std::collections::BTreeSet;

/// Keys the user has toggled off.
///
/// Kept apart from the data so a refresh with the same keys keeps the
/// user's choices; keys that disappear are simply never matched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeriesVisibility {
    hidden: BTreeSet<String>,
}

impl SeriesVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, key: &str) -> bool {
        !self.hidden.contains(key)
    }

    pub fn hide(&mut self, key: &str) {
        self.hidden.insert(key.to_string());
    }

    pub fn show(&mut self, key: &str) {
        self.hidden.remove(key);
    }

    /// Flips `key` and returns whether it is now visible
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.hidden.remove(key) {
            true
        } else {
            self.hidden.insert(key.to_string());
            false
        }
    }

    /// Copy with `key` flipped, for immutable state holders
    pub fn toggled(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.toggle(key);
        next
    }

    pub fn hidden_keys(&self) -> impl Iterator<Item = &str> {
        self.hidden.iter().map(String::as_str)
    }
}

/// One clickable legend item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub key: String,
    pub label: String,
    pub color: String,
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        let mut visibility = SeriesVisibility::new();
        assert!(visibility.is_visible("k1"));
        assert!(!visibility.toggle("k1"));
        assert!(!visibility.is_visible("k1"));
        assert!(visibility.toggle("k1"));
        assert!(visibility.is_visible("k1"));
    }

    #[test]
    fn test_unknown_keys_stay_visible() {
        let visibility = SeriesVisibility::new().toggled("gone");
        assert!(visibility.is_visible("k1"));
        assert_eq!(visibility.hidden_keys().collect::<Vec<_>>(), vec!["gone"]);
    }
}
