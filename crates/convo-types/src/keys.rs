use uuid::Uuid;

/// Replace every occurrence of `old` with `new`, then drop duplicates.
/// Order of first appearance is preserved.
pub fn swap_keys(keys: &[Uuid], old: Uuid, new: Uuid) -> Vec<Uuid> {
    dedup_keys(keys.iter().map(|&k| if k == old { new } else { k }))
}

/// Concatenate two key lists without duplicates.
pub fn merge_keys(a: &[Uuid], b: &[Uuid]) -> Vec<Uuid> {
    dedup_keys(a.iter().chain(b.iter()).copied())
}

fn dedup_keys(keys: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut clean: Vec<Uuid> = Vec::new();
    for key in keys {
        if !clean.contains(&key) {
            clean.push(key);
        }
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_keys_replaces_and_dedups() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        let other = Uuid::new_v4();

        let swapped = swap_keys(&[new, old, other], old, new);

        assert_eq!(swapped, vec![new, other]);
    }

    #[test]
    fn swap_keys_without_old_is_unchanged() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(swap_keys(&[a, b], Uuid::new_v4(), Uuid::new_v4()), vec![a, b]);
    }

    #[test]
    fn merge_keys_is_a_union() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        assert_eq!(merge_keys(&[a, b], &[b, c]), vec![a, b, c]);
    }
}
