use serde::Serialize;

/// Two series index-aligned on one ordered key sequence. `None` marks a key
/// the corresponding source series has no value for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries<K, V> {
    pub keys: Vec<K>,
    pub series_a: Vec<Option<V>>,
    pub series_b: Vec<Option<V>>,
}

impl<K, V> AlignedSeries<K, V> {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates `(key, a, b)` rows
    pub fn rows(&self) -> impl Iterator<Item = (&K, Option<&V>, Option<&V>)> {
        self.keys
            .iter()
            .zip(self.series_a.iter().zip(self.series_b.iter()))
            .map(|(k, (a, b))| (k, a.as_ref(), b.as_ref()))
    }
}

impl<K, V> Default for AlignedSeries<K, V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            series_a: Vec::new(),
            series_b: Vec::new(),
        }
    }
}
