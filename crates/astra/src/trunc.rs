//! Probabilistic truncation tuples.
//!
//! A tuple describes one truncation request: `k` significant bits in the
//! source value, shift by `m`. The gap between `k` and the ring width
//! decides the protocol: values leaving at least `trunc_error` unused top
//! bits take the cheap one-round path, everything else the
//! correction-based path after Mohassel-Zhang. The classification only
//! depends on public parameters and is therefore identical on all parties.
use crate::errors::Error;
use crate::ring::Ring;
use std::marker::PhantomData;

/// Default statistical security for the truncation error (2^-x).
pub const DEFAULT_TRUNC_ERROR: usize = 40;

#[derive(Clone, Copy, Debug)]
pub struct TruncPrTuple<R> {
    pub k: usize,
    pub m: usize,
    big_gap: bool,
    _ring: PhantomData<R>,
}

impl<R: Ring> TruncPrTuple<R> {
    pub fn new(k: usize, m: usize, trunc_error: usize) -> Result<Self, Error> {
        if k == 0 || m >= k || k > R::BITS {
            return Err(Error::Configuration(format!(
                "invalid truncation parameters k={k}, m={m} for {} bit domain",
                R::BITS
            )));
        }
        Ok(Self {
            k,
            m,
            big_gap: k <= R::BITS - trunc_error.min(R::BITS),
            _ring: PhantomData,
        })
    }

    pub fn big_gap(&self) -> bool {
        self.big_gap
    }

    pub fn small_gap(&self) -> bool {
        !self.big_gap
    }

    /// Offset making the masked value positive before truncation.
    pub fn add_before(&self) -> R {
        R::ONE.wrapping_shl(self.k - 1)
    }

    /// Offset removed again after truncation.
    pub fn subtract_after(&self) -> R {
        R::ONE.wrapping_shl(self.k - self.m - 1)
    }

    /// Lift a carry bit to the weight it has in the truncated value.
    pub fn correction_shift(&self, bit: R) -> R {
        bit.wrapping_shl(R::BITS - self.m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_classification() {
        let t = TruncPrTuple::<u64>::new(20, 10, DEFAULT_TRUNC_ERROR).unwrap();
        assert!(t.big_gap());
        let t = TruncPrTuple::<u64>::new(24, 10, DEFAULT_TRUNC_ERROR).unwrap();
        assert!(t.big_gap());
        let t = TruncPrTuple::<u64>::new(25, 10, DEFAULT_TRUNC_ERROR).unwrap();
        assert!(t.small_gap());
        let t = TruncPrTuple::<u64>::new(64, 3, DEFAULT_TRUNC_ERROR).unwrap();
        assert!(t.small_gap());
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(TruncPrTuple::<u64>::new(0, 0, 40).is_err());
        assert!(TruncPrTuple::<u64>::new(10, 10, 40).is_err());
        assert!(TruncPrTuple::<u64>::new(65, 1, 40).is_err());
    }

    #[test]
    fn offsets() {
        let t = TruncPrTuple::<u64>::new(64, 3, 40).unwrap();
        assert_eq!(t.add_before(), 1 << 63);
        assert_eq!(t.subtract_after(), 1 << 60);
        assert_eq!(t.correction_shift(1), 1 << 61);
    }
}
