//! Picture ordering policies.
//!
//! A [`Playlist`] owns the scanned pictures and hands out one full pass at a
//! time.  Depending on the [`OrderPolicy`] a pass is the scan order, a single
//! startup shuffle, or a fresh shuffle whose first picture never repeats the
//! first picture of the previous pass.

use crate::scanner::Picture;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

/// How a randomized rotation reorders pictures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomMode {
    /// Shuffle once at startup and keep that order forever.
    Once,
    /// Shuffle again before every pass.
    #[default]
    EveryPass,
}

/// Order in which a [`Playlist`] yields pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPolicy {
    /// Scan order, unchanged on every pass.
    Stable,
    /// One uniform shuffle before the first pass.
    ShuffleOnce,
    /// A uniform shuffle before every pass, never starting with the picture
    /// that started the previous pass.
    Reshuffle,
}

impl OrderPolicy {
    /// Map the `--random` flag and the configured [`RandomMode`] to a policy.
    pub fn from_flags(random: bool, mode: RandomMode) -> Self {
        match (random, mode) {
            (false, _) => OrderPolicy::Stable,
            (true, RandomMode::Once) => OrderPolicy::ShuffleOnce,
            (true, RandomMode::EveryPass) => OrderPolicy::Reshuffle,
        }
    }
}

/// Shuffle `items` so that the element currently at index 0 does not end up
/// at index 0 again.
///
/// The new head is drawn uniformly from the other positions and the tail is
/// then shuffled, so every permutation with a different head is equally
/// likely.  Slices of length ≤ 1 are left untouched.
pub fn reshuffle_avoiding_head<T, R: Rng>(items: &mut [T], rng: &mut R) {
    if items.len() <= 1 {
        return;
    }
    let new_head = rng.random_range(1..items.len());
    items.swap(0, new_head);
    items[1..].shuffle(rng);
}

/// The picture sequence plus the policy that reorders it between passes.
#[derive(Debug, Clone)]
pub struct Playlist {
    policy: OrderPolicy,
    pictures: Vec<Picture>,
    passes: u64,
}

impl Playlist {
    pub fn new(policy: OrderPolicy, pictures: Vec<Picture>) -> Self {
        Self {
            policy,
            pictures,
            passes: 0,
        }
    }

    pub fn policy(&self) -> OrderPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    /// Number of passes handed out so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Reorder according to the policy and return the next full pass.
    pub fn next_pass<R: Rng>(&mut self, rng: &mut R) -> &[Picture] {
        let first = self.passes == 0;
        match self.policy {
            OrderPolicy::Stable => {}
            OrderPolicy::ShuffleOnce if first => self.pictures.shuffle(rng),
            OrderPolicy::ShuffleOnce => {}
            OrderPolicy::Reshuffle if first => self.pictures.shuffle(rng),
            OrderPolicy::Reshuffle => reshuffle_avoiding_head(&mut self.pictures, rng),
        }
        self.passes += 1;
        debug!("pass {} ({:?}, {} picture(s))", self.passes, self.policy, self.pictures.len());
        &self.pictures
    }
}
