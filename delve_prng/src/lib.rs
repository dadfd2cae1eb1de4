// delve_prng: seedable random source for Delve rule collaborators.
//
// Lockstep peers must resolve every turn identically, so nothing that feeds a
// resolver may draw from OS entropy or a thread-local default generator. Every
// random decision (trap rolls, chest rarity, escape checks, and the delivery
// shuffles used by the multiplayer harness) goes through a `GameRng` that the
// host constructs from an explicit seed and hands to whoever needs it.
//
// The generator is xoshiro256++ (Blackman & Vigna) with SplitMix64 seeding.
// `fork()` derives an independent child stream from a label so that each
// collaborator can own its generator without peers having to agree on the
// order in which collaborators consume numbers.
//
// **Critical constraint: determinism.** Identical seeds must yield identical
// sequences on every platform. The core generator uses integer arithmetic
// only; floating-point helpers are derived from integer output.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ generator with explicit, serializable state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Seed a generator. The seed is expanded to 256 bits with SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Derive an independent generator for a named consumer.
    ///
    /// The child is seeded from this generator's next output mixed with a
    /// hash of `label`, so forking the same parent state with the same label
    /// always yields the same child stream.
    pub fn fork(&mut self, label: &str) -> Self {
        let mut mixed = self.next_u64();
        for byte in label.bytes() {
            mixed = (mixed ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3);
        }
        Self::new(mixed)
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f64` in [0, 1), built from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[low, high)` without modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let span = high - low;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1));
        }
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % span);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`. Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Uniform signed integer in `[low, high]`, inclusive on both ends.
    ///
    /// Panics if `low > high`.
    pub fn range_i64_inclusive(&mut self, low: i64, high: i64) -> i64 {
        assert!(low <= high, "range_i64_inclusive: low must be <= high");
        let span = high.abs_diff(low);
        if span == u64::MAX {
            return self.next_u64() as i64;
        }
        low.wrapping_add(self.range_u64(0, span + 1) as i64)
    }

    /// `true` with probability `p`. `p <= 0.0` never fires, `p >= 1.0` always does.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }

    /// Pick a uniformly random element, or `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.range_usize(0, items.len());
        items.get(idx)
    }
}

/// SplitMix64 step, used only to expand seeds.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
