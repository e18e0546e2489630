//! The two-phase protocol engine.
//!
//! [`prep`] hosts the function-dependent preprocessing run by all three
//! parties; [`online`] the evaluation run by parties 1 and 2 on the tapes
//! the preprocessing produced. Astra and Trio share all machinery except
//! the share layout and the multiplication message flow, which enter
//! through the [`PrepKind`](prep::PrepKind) and
//! [`OnlineShare`](online::OnlineShare) hooks.
use crate::errors::Error;
use crate::octets::Octets;
use crate::prng::{Seed, SharedPrngs};
use astra_channel::multi::{MultiReceiver, MultiSender};
use serde::{Deserialize, Serialize};

pub mod online;
pub mod prep;

pub use online::{Astra, OnlineProtocol, OnlineShare, Trio};
pub use prep::{AstraPrepProtocol, PrepKind, PrepProtocol, TrioPrepProtocol};

/// Party generating truncation correlations.
pub(crate) const GEN_PLAYER: usize = 0;
/// Party receiving the generated correlations.
pub(crate) const COMP_PLAYER: usize = 1;

/// Everything the parties exchange: PRNG seeds at startup, raw limb
/// buffers afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Msg {
    Seed(Seed),
    Buf(Octets),
}

/// Per-protocol-instance communication statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub rounds: usize,
    pub dot_products: usize,
    pub trunc_pr_count: usize,
    pub trunc_rounds: usize,
}

/// A party's view of the point-to-point channels.
pub struct Channels {
    my_num: usize,
    sender: MultiSender<Msg>,
    receiver: MultiReceiver<Msg>,
}

impl Channels {
    pub fn new(my_num: usize, sender: MultiSender<Msg>, receiver: MultiReceiver<Msg>) -> Self {
        Self {
            my_num,
            sender,
            receiver,
        }
    }

    pub fn my_num(&self) -> usize {
        self.my_num
    }

    pub async fn send_buf(&mut self, to: usize, os: Octets) -> Result<(), Error> {
        self.sender.send_to([to as u32], Msg::Buf(os)).await?;
        Ok(())
    }

    pub async fn recv_buf(&mut self, from: usize) -> Result<Octets, Error> {
        match self.receiver.recv_from_single(from as u32).await? {
            Msg::Buf(os) => Ok(os),
            Msg::Seed(_) => Err(Error::Assertion("expected buffer, received seed")),
        }
    }

    /// One pass-around round: send own buffer, receive the peer's.
    pub async fn exchange_buf(&mut self, with: usize, os: Octets) -> Result<Octets, Error> {
        self.send_buf(with, os).await?;
        self.recv_buf(with).await
    }

    async fn recv_seed(&mut self, from: usize) -> Result<Seed, Error> {
        match self.receiver.recv_from_single(from as u32).await? {
            Msg::Seed(seed) => Ok(seed),
            Msg::Buf(_) => Err(Error::Assertion("expected seed, received buffer")),
        }
    }

    /// Pass the own seed to the next party in the ring and key the pair of
    /// correlated generators with it and the one received from the previous
    /// party.
    pub async fn setup_prngs(&mut self, own_seed: Seed) -> Result<SharedPrngs, Error> {
        let next = (self.my_num + 1) % 3;
        let prev = (self.my_num + 2) % 3;
        self.sender
            .send_to([next as u32], Msg::Seed(own_seed))
            .await?;
        let received = self.recv_seed(prev).await?;
        Ok(SharedPrngs::from_seeds([own_seed, received]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_channel::multi;

    #[tokio::test]
    async fn seed_ring_correlates_neighbours() {
        let channels = multi::new_local::<Msg>(3);
        let setups = channels
            .into_iter()
            .enumerate()
            .map(|(i, (sender, receiver))| async move {
                let mut ch = Channels::new(i, sender, receiver);
                ch.setup_prngs([i as u8 + 1; 32]).await
            });
        let mut it = setups.into_iter();
        let (f0, f1, f2) = (it.next().unwrap(), it.next().unwrap(), it.next().unwrap());
        let (p0, p1, p2) = tokio::try_join!(f0, f1, f2).unwrap();
        let mut prngs = [p0, p1, p2];
        for i in 0..3 {
            let a: u64 = prngs[i].gen(0);
            let b: u64 = prngs[(i + 1) % 3].gen(1);
            assert_eq!(a, b, "parties {i} and {} share a stream", (i + 1) % 3);
        }
    }
}
