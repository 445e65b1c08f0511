//! Single-region diff over ordered sequences.
//!
//! Finds the one contiguous block that differs between `old` and `new`: the
//! longest common prefix and the longest common suffix that does not overlap
//! it are left alone, everything in between is reported as replaced.

use serde::{Deserialize, Serialize};

/// `removed` elements starting at `start` are replaced by `added` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRegion {
    pub start: usize,
    pub removed: usize,
    pub added: usize,
}

impl ChangeRegion {
    pub fn new(start: usize, removed: usize, added: usize) -> Self {
        Self { start, removed, added }
    }

    /// Exclusive end of the removed range in the old sequence.
    pub fn old_end(&self) -> usize {
        self.start + self.removed
    }

    /// Exclusive end of the inserted range in the new sequence.
    pub fn new_end(&self) -> usize {
        self.start + self.added
    }

    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.added == 0
    }

    /// Splice `current[start..old_end)` out and `target[start..new_end)` in.
    ///
    /// # Panics
    ///
    /// If `old_end()` exceeds `current.len()` or `new_end()` exceeds
    /// `target.len()`. Regions returned by `change_region(current, target)`
    /// always fit.
    pub fn apply<T: Clone>(&self, current: &mut Vec<T>, target: &[T]) {
        current.splice(
            self.start..self.old_end(),
            target[self.start..self.new_end()].iter().cloned(),
        );
    }
}

/// The single region turning `old` into `new`, or `None` when equal.
pub fn change_region<T: PartialEq>(old: &[T], new: &[T]) -> Option<ChangeRegion> {
    let old_len = old.len();
    let new_len = new.len();
    let shortest = old_len.min(new_len);

    let first_change = match (0..shortest).find(|&i| old[i] != new[i]) {
        Some(i) => i,
        None if old_len == new_len => return None,
        // pure append or truncation
        None => shortest,
    };

    // The suffix scan must not re-enter the prefix already matched.
    let overlap = shortest - first_change;
    let unchanged_tail = (1..=overlap)
        .find(|&i| old[old_len - i] != new[new_len - i])
        .map_or(overlap, |i| i - 1);

    Some(ChangeRegion {
        start: first_change,
        removed: old_len - unchanged_tail - first_change,
        added: new_len - unchanged_tail - first_change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_equal_sequences_have_no_region() {
        assert_eq!(change_region(&chars("abcd"), &chars("abcd")), None);
        assert_eq!(change_region::<char>(&[], &[]), None);
    }

    #[test]
    fn test_single_swap() {
        assert_eq!(
            change_region(&chars("abcd"), &chars("axcd")),
            Some(ChangeRegion::new(1, 1, 1))
        );
    }

    #[test]
    fn test_trailing_append_and_truncate() {
        assert_eq!(change_region(&chars("ab"), &chars("abc")), Some(ChangeRegion::new(2, 0, 1)));
        assert_eq!(change_region(&chars("abc"), &chars("a")), Some(ChangeRegion::new(1, 2, 0)));
        assert_eq!(change_region(&[], &chars("ab")), Some(ChangeRegion::new(0, 0, 2)));
    }

    #[test]
    fn test_leading_insert_and_remove() {
        assert_eq!(change_region(&chars("bc"), &chars("abc")), Some(ChangeRegion::new(0, 0, 1)));
        assert_eq!(change_region(&chars("abc"), &chars("bc")), Some(ChangeRegion::new(0, 1, 0)));
    }

    #[test]
    fn test_middle_insert() {
        assert_eq!(change_region(&chars("abd"), &chars("abcd")), Some(ChangeRegion::new(2, 0, 1)));
    }

    #[test]
    fn test_repeated_elements_do_not_overlap_prefix() {
        // Suffix matching stops at the prefix boundary.
        assert_eq!(change_region(&chars("aa"), &chars("aaa")), Some(ChangeRegion::new(2, 0, 1)));
        assert_eq!(change_region(&chars("aaa"), &chars("a")), Some(ChangeRegion::new(1, 2, 0)));
    }

    #[test]
    fn test_full_replace() {
        assert_eq!(change_region(&chars("abc"), &chars("xyz")), Some(ChangeRegion::new(0, 3, 3)));
    }

    #[test]
    fn test_apply_splices() {
        let mut current = chars("abcd");
        let target = chars("axyd");
        let region = change_region(&current, &target).unwrap();
        assert_eq!(region, ChangeRegion::new(1, 2, 2));
        region.apply(&mut current, &target);
        assert_eq!(current, target);
    }

    #[test]
    #[should_panic]
    fn test_apply_out_of_range_region_panics() {
        let mut current = chars("ab");
        ChangeRegion::new(1, 5, 0).apply(&mut current, &chars("ab"));
    }

    proptest! {
        #[test]
        fn prop_apply_yields_target(
            old in proptest::collection::vec(0u8..4, 0..12),
            new in proptest::collection::vec(0u8..4, 0..12),
        ) {
            let mut current = old.clone();
            match change_region(&old, &new) {
                None => prop_assert_eq!(&old, &new),
                Some(region) => {
                    prop_assert!(!region.is_empty());
                    region.apply(&mut current, &new);
                    prop_assert_eq!(&current, &new);
                }
            }
        }

        #[test]
        fn prop_region_keeps_maximal_prefix(
            old in proptest::collection::vec(0u8..4, 0..12),
            new in proptest::collection::vec(0u8..4, 0..12),
        ) {
            if let Some(region) = change_region(&old, &new) {
                prop_assert_eq!(&old[..region.start], &new[..region.start]);
                // Element right at `start` differs unless one side ran out.
                if region.start < old.len() && region.start < new.len() {
                    prop_assert_ne!(old[region.start], new[region.start]);
                }
                prop_assert_eq!(&old[region.old_end()..], &new[region.new_end()..]);
            }
        }
    }
}
