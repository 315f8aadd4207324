//! Random sampling of quiz questions from a category pool.

use rand::{seq::SliceRandom, Rng};

/// A uniformly shuffled copy of `pool`, truncated to `min(count, pool.len())`.
pub fn select_subset<T: Clone>(pool: &[T], count: usize) -> Vec<T> {
  select_subset_with(pool, count, &mut rand::thread_rng())
}

/// Same as [`select_subset`] with a caller-provided RNG. Uses an unbiased
/// Fisher–Yates shuffle; the input is never touched.
pub fn select_subset_with<T: Clone, R: Rng + ?Sized>(pool: &[T], count: usize, rng: &mut R) -> Vec<T> {
  let mut picked = pool.to_vec();
  picked.shuffle(rng);
  picked.truncate(count.min(pool.len()));
  picked
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};
  use std::collections::HashSet;

  #[test]
  fn ten_of_fifteen_are_unique_members() {
    let pool: Vec<u32> = (0..15).collect();
    let before = pool.clone();
    for _ in 0..1000 {
      let picked = select_subset(&pool, 10);
      assert_eq!(picked.len(), 10);
      let unique: HashSet<_> = picked.iter().collect();
      assert_eq!(unique.len(), 10);
      assert!(picked.iter().all(|p| pool.contains(p)));
    }
    assert_eq!(pool, before);
  }

  #[test]
  fn small_pool_returns_everything() {
    let pool = vec!["a", "b", "c", "d", "e"];
    let mut picked = select_subset(&pool, 10);
    picked.sort();
    assert_eq!(picked, pool);
    assert!(select_subset::<u8>(&[], 10).is_empty());
  }

  #[test]
  fn every_position_is_reachable() {
    // Each element should land first roughly 1/5 of the time.
    let pool: Vec<usize> = (0..5).collect();
    let mut rng = StdRng::seed_from_u64(7);
    let mut firsts = [0usize; 5];
    for _ in 0..5000 {
      firsts[select_subset_with(&pool, 5, &mut rng)[0]] += 1;
    }
    assert!(firsts.iter().all(|&n| (800..1200).contains(&n)), "{firsts:?}");
  }
}
