//! # astra
//!
//! A three-party, semi-honest, honest-majority MPC engine over ℤ/2ᵏ
//! implementing the function-dependent Astra and Trio protocol families.
//!
//! The engine runs in two phases. The **preprocessing phase**
//! ([`protocols::PrepProtocol`]) is input-independent: all three parties
//! derive correlated randomness from pairwise-shared ChaCha20 streams, the
//! helper (party 0) contributes the products of secret masks, and parties 1
//! and 2 persist their tape entries to per-thread files. The **online
//! phase** ([`protocols::OnlineProtocol`]) is run by parties 1 and 2 alone:
//! it consumes the tapes alongside the actual inputs and needs exactly one
//! pass-around round per multiplication, truncation, unsplit or opening
//! batch.
//!
//! Everything above the batched `init → prepare* → exchange → finalize*`
//! interface — bytecode scheduling, circuit compilation, command lines — is
//! an external collaborator.
pub mod config;
pub mod errors;
pub mod input;
pub mod octets;
pub mod open;
pub mod prng;
pub mod protocols;
pub mod ring;
pub mod share;
pub mod tape;
pub mod trunc;

pub use astra_channel as channel;

pub use config::Options;
pub use errors::Error;
pub use input::{OnlineInput, PrepInput};
pub use octets::Octets;
pub use open::{AstraMC, Opener, TrioMC};
pub use protocols::{
    Astra, AstraPrepProtocol, Channels, Msg, OnlineProtocol, OnlineShare, PrepKind, PrepProtocol,
    Stats, Trio, TrioPrepProtocol,
};
pub use ring::{Ring, Z2k, Z2k192, Z2k256, Z2k384, Z2k512};
pub use share::{
    AstraPrepShare, AstraShare, Limbs, MaskedShare, PrepShare, TrioPrepShare, TrioShare,
};
pub use trunc::TruncPrTuple;
