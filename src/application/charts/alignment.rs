use crate::domain::charts::AlignedSeries;
use std::collections::{BTreeMap, BTreeSet};

/// Aligns two keyed series on the sorted union of their keys.
///
/// With `limit`, only the most recent `limit` keys are kept. Values are
/// looked up by exact key; a series lacking a key yields `None` there.
pub fn align<K, V>(
    a: &BTreeMap<K, V>,
    b: &BTreeMap<K, V>,
    limit: Option<usize>,
) -> AlignedSeries<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    let union: BTreeSet<&K> = a.keys().chain(b.keys()).collect();
    let skip = limit.map_or(0, |n| union.len().saturating_sub(n));

    let mut aligned = AlignedSeries::default();
    for key in union.into_iter().skip(skip) {
        aligned.series_a.push(a.get(key).cloned());
        aligned.series_b.push(b.get(key).cloned());
        aligned.keys.push(key.clone());
    }
    aligned
}

/// Values of `series` at `keys`, `None` where absent
pub fn project<K: Ord, V: Clone>(series: &BTreeMap<K, V>, keys: &[K]) -> Vec<Option<V>> {
    keys.iter().map(|k| series.get(k).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(&'static str, f64)]) -> BTreeMap<&'static str, f64> {
        points.iter().copied().collect()
    }

    #[test]
    fn test_partial_overlap() {
        let a = series(&[("2024-01-01", 100.0), ("2024-01-02", 101.0)]);
        let b = series(&[("2024-01-02", 99.0)]);

        let aligned = align(&a, &b, None);
        assert_eq!(aligned.keys, vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(aligned.series_a, vec![Some(100.0), Some(101.0)]);
        assert_eq!(aligned.series_b, vec![None, Some(99.0)]);
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let a = series(&[("d1", 1.0), ("d3", 3.0), ("d5", 5.0)]);
        let b = series(&[("d2", 2.0), ("d4", 4.0)]);

        let aligned = align(&a, &b, Some(2));
        assert_eq!(aligned.keys, vec!["d4", "d5"]);
        assert_eq!(aligned.series_a, vec![None, Some(5.0)]);
        assert_eq!(aligned.series_b, vec![Some(4.0), None]);

        assert_eq!(align(&a, &b, Some(10)).len(), 5);
        assert!(align(&a, &b, Some(0)).is_empty());
    }

    #[test]
    fn test_keys_are_sorted_union() {
        let a = series(&[("c", 1.0), ("a", 1.0)]);
        let b = series(&[("b", 1.0), ("a", 2.0)]);
        let aligned = align(&a, &b, None);

        assert_eq!(aligned.keys, vec!["a", "b", "c"]);
        assert_eq!(aligned.series_a.len(), aligned.keys.len());
        assert_eq!(aligned.series_b.len(), aligned.keys.len());
    }

    #[test]
    fn test_empty_inputs() {
        let empty: BTreeMap<&str, f64> = BTreeMap::new();
        let b = series(&[("x", 1.0)]);
        assert!(align(&empty, &empty, None).is_empty());

        let aligned = align(&empty, &b, None);
        assert_eq!(aligned.series_a, vec![None]);
        assert_eq!(aligned.rows().next(), Some((&"x", None, Some(&1.0))));
    }

    #[test]
    fn test_project() {
        let s = series(&[("a", 1.0)]);
        assert_eq!(project(&s, &["a", "b"]), vec![Some(1.0), None]);
    }
}
