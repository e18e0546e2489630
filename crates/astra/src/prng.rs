//! Correlated pseudo-randomness.
//!
//! Each party holds two ChaCha20 streams. After setup, slot 0 is keyed with
//! the party's own seed (which was sent to the next party in the ring) and
//! slot 1 with the seed received from the previous party. Party *i*'s slot 0
//! therefore produces the same stream as party *i+1*'s slot 1; all "free"
//! correlations of the preprocessing phase are drawn from these streams
//! without communication.
use rand::distributions::{Distribution, Standard};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

pub const SEED_SIZE: usize = 32;

pub type Seed = [u8; SEED_SIZE];

#[derive(Clone, Debug)]
pub struct SharedPrngs {
    prngs: [ChaChaRng; 2],
}

impl SharedPrngs {
    /// `seeds[0]` is the own seed (shared with the next party), `seeds[1]`
    /// the one received from the previous party.
    pub fn from_seeds(seeds: [Seed; 2]) -> Self {
        Self {
            prngs: [ChaChaRng::from_seed(seeds[0]), ChaChaRng::from_seed(seeds[1])],
        }
    }

    /// Draw from one of the two correlated streams.
    pub fn gen<R>(&mut self, slot: usize) -> R
    where
        Standard: Distribution<R>,
    {
        self.prngs[slot].gen()
    }

    /// Draw one value from each stream, slot 0 first.
    pub fn gen_pair<R>(&mut self) -> [R; 2]
    where
        Standard: Distribution<R>,
    {
        [self.prngs[0].gen(), self.prngs[1].gen()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_seeds(parties: usize) -> Vec<[Seed; 2]> {
        let own: Vec<Seed> = (0..parties).map(|i| [i as u8 + 1; SEED_SIZE]).collect();
        (0..parties)
            .map(|i| [own[i], own[(i + parties - 1) % parties]])
            .collect()
    }

    #[test]
    fn adjacent_parties_share_a_stream() {
        let mut prngs: Vec<_> = ring_seeds(3)
            .into_iter()
            .map(SharedPrngs::from_seeds)
            .collect();
        for i in 0..3 {
            let (left, right) = (i, (i + 1) % 3);
            let a: u64 = prngs[left].gen(0);
            let b: u64 = prngs[right].gen(1);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn non_adjacent_slots_differ() {
        let mut prngs: Vec<_> = ring_seeds(3)
            .into_iter()
            .map(SharedPrngs::from_seeds)
            .collect();
        let a: u64 = prngs[0].gen(0);
        let b: u64 = prngs[2].gen(0);
        assert_ne!(a, b);
    }
}
