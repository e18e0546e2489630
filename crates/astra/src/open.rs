//! Reconstruction of shared values between the two online parties.
//!
//! Party 1 contributes `m + neg_lambda⁽¹⁾`, party 2 its `neg_lambda⁽²⁾`
//! (Trio parties send their limb directly); summing both sides yields the
//! clear value. One exchange round per batch.
use crate::errors::Error;
use crate::octets::Octets;
use crate::protocols::{OnlineProtocol, OnlineShare};
use crate::ring::Ring;
use std::collections::VecDeque;

pub type AstraMC<R> = Opener<R, crate::share::AstraShare<R>>;
pub type TrioMC<R> = Opener<R, crate::share::TrioShare<R>>;

pub struct Opener<R, S> {
    secrets: Vec<S>,
    values: VecDeque<R>,
}

impl<R, S> Default for Opener<R, S> {
    fn default() -> Self {
        Self {
            secrets: Vec::new(),
            values: VecDeque::new(),
        }
    }
}

impl<R, S> Opener<R, S>
where
    R: Ring,
    S: OnlineShare<R>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare_open(&mut self, secret: &S) {
        self.secrets.push(*secret);
    }

    pub async fn exchange(&mut self, p: &mut OnlineProtocol<R, S>) -> Result<(), Error> {
        let my_num = p.my_num();
        let mut os = Octets::with_capacity(self.secrets.len() * R::BYTES);
        for secret in &self.secrets {
            os.store(secret.open_summand(my_num));
        }
        let mut recv = p.channels.exchange_buf(p.other(), os).await?;
        recv.require::<R>(self.secrets.len())?;
        for secret in self.secrets.drain(..) {
            let summand = secret.open_summand(my_num);
            self.values.push_back(summand.wrapping_add(&recv.get::<R>()?));
        }
        Ok(())
    }

    pub fn finalize_open(&mut self) -> Result<R, Error> {
        self.values
            .pop_front()
            .ok_or(Error::Assertion("no opened value left"))
    }

    /// Convenience wrapper opening a batch in one round.
    pub async fn open(
        &mut self,
        p: &mut OnlineProtocol<R, S>,
        secrets: &[S],
    ) -> Result<Vec<R>, Error> {
        for secret in secrets {
            self.prepare_open(secret);
        }
        self.exchange(p).await?;
        let mut res = Vec::with_capacity(secrets.len());
        for _ in 0..secrets.len() {
            res.push(self.finalize_open()?);
        }
        Ok(res)
    }
}
