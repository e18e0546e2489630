//! Engine configuration. Command-line parsing and connection establishment
//! are left to the embedding application; this is the validated form the
//! engine consumes.
use crate::errors::Error;
use crate::ring::{Ring, SUPPORTED_BITS};
use crate::tape::tape_path;
use crate::trunc::DEFAULT_TRUNC_ERROR;
use std::path::PathBuf;

pub const N_PARTIES: usize = 3;

#[derive(Clone, Debug)]
pub struct Options {
    /// Ring bitwidth k of ℤ/2ᵏ.
    pub ring_bits: usize,
    /// Probabilistic truncation error exponent (2^-x).
    pub trunc_error: usize,
    /// Directory holding preprocessing tapes and output files.
    pub player_data: PathBuf,
    /// Protocol thread this instance belongs to.
    pub thread_num: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ring_bits: 64,
            trunc_error: DEFAULT_TRUNC_ERROR,
            player_data: PathBuf::from("Player-Data"),
            thread_num: 0,
        }
    }
}

impl Options {
    /// Check that the configured domain matches the instantiated ring type.
    pub fn check_ring<R: Ring>(&self) -> Result<(), Error> {
        if !SUPPORTED_BITS.contains(&self.ring_bits) {
            return Err(Error::Configuration(format!(
                "unsupported ring bitwidth {} (supported: {SUPPORTED_BITS:?})",
                self.ring_bits
            )));
        }
        if self.ring_bits != R::BITS {
            return Err(Error::Configuration(format!(
                "configured bitwidth {} does not match instantiated domain of {} bits",
                self.ring_bits,
                R::BITS
            )));
        }
        Ok(())
    }

    pub fn check_party(&self, my_num: usize) -> Result<(), Error> {
        if my_num >= N_PARTIES {
            return Err(Error::Configuration(format!(
                "party number {my_num} out of range for {N_PARTIES} parties"
            )));
        }
        Ok(())
    }

    pub fn prep_tape_path<R: Ring>(&self, protocol: &str, party: usize) -> PathBuf {
        tape_path(
            &self.player_data,
            protocol,
            R::BITS,
            "Protocol",
            party,
            self.thread_num,
        )
    }

    pub fn outputs_path<R: Ring>(&self, protocol: &str, party: usize) -> PathBuf {
        tape_path(
            &self.player_data,
            protocol,
            R::BITS,
            "Outputs",
            party,
            self.thread_num,
        )
    }

    /// Location of edabit-style preprocessing, kept for compatibility with
    /// the established storage layout.
    pub fn edabits_path<R: Ring>(&self, protocol: &str, party: usize) -> PathBuf {
        tape_path(
            &self.player_data,
            protocol,
            R::BITS,
            "edaBits",
            party,
            self.thread_num,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::Z2k256;

    #[test]
    fn ring_validation() {
        let opts = Options::default();
        assert!(opts.check_ring::<u64>().is_ok());
        assert!(opts.check_ring::<u32>().is_err());

        let opts = Options {
            ring_bits: 256,
            ..Options::default()
        };
        assert!(opts.check_ring::<Z2k256>().is_ok());
        let err = opts.check_ring::<u64>().unwrap_err();
        assert!(err.to_string().contains("does not match"));

        let opts = Options {
            ring_bits: 48,
            ..Options::default()
        };
        let err = opts.check_ring::<u64>().unwrap_err();
        assert!(err.to_string().contains("unsupported ring bitwidth"));
    }

    #[test]
    fn party_validation() {
        let opts = Options::default();
        assert!(opts.check_party(2).is_ok());
        assert!(opts.check_party(3).is_err());
    }

    #[test]
    fn paths() {
        let opts = Options::default();
        assert_eq!(
            opts.prep_tape_path::<u64>("astra", 1),
            PathBuf::from("Player-Data/3-astra-Z2k64/Protocol-P1-T0")
        );
        assert_eq!(
            opts.outputs_path::<Z2k256>("trio", 2),
            PathBuf::from("Player-Data/3-trio-Z2k256/Outputs-P2-T0")
        );
    }
}
