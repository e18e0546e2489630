//! Private inputs.
//!
//! Preprocessing: the helper derives the input mask limbs from the
//! generators it shares with the owners; each owner draws its γ and puts it
//! on tape. Online: the owner reads γ back, sends `x - γ` to its partner,
//! and both end up with a sharing of x. The helper's shares are filled
//! purely from generator state, without communication.
use crate::errors::Error;
use crate::octets::Octets;
use crate::protocols::{OnlineProtocol, OnlineShare, PrepKind, PrepProtocol};
use crate::ring::Ring;
use rand::distributions::{Distribution, Standard};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::mem;

/// Input preprocessing, run by all three parties.
pub struct PrepInput<R, S> {
    n_inputs: [usize; 3],
    results: [VecDeque<S>; 3],
    prep_os: Octets,
    _ring: PhantomData<R>,
}

impl<R, S> Default for PrepInput<R, S> {
    fn default() -> Self {
        Self {
            n_inputs: [0; 3],
            results: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            prep_os: Octets::new(),
            _ring: PhantomData,
        }
    }
}

impl<R, S> PrepInput<R, S>
where
    R: Ring,
    S: PrepKind<R>,
    Standard: Distribution<R>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.n_inputs = [0; 3];
        for r in &mut self.results {
            r.clear();
        }
        self.prep_os.reset_write_head();
    }

    /// Declare an input; the value itself only enters online.
    pub fn add_mine(&mut self, p: &PrepProtocol<R, S>) -> Result<(), Error> {
        self.add_other(p.my_num())
    }

    /// Declare an input owned by `owner`.
    pub fn add_other(&mut self, owner: usize) -> Result<(), Error> {
        if !matches!(owner, 1 | 2) {
            return Err(Error::Assertion("the helper cannot provide inputs"));
        }
        self.n_inputs[owner] += 1;
        Ok(())
    }

    pub async fn exchange(&mut self, p: &mut PrepProtocol<R, S>) -> Result<(), Error> {
        match p.my_num() {
            0 => {
                for owner in [1, 2] {
                    for _ in 0..self.n_inputs[owner] {
                        let limb: R = p.prngs.gen(owner - 1);
                        let mut limbs = [R::ZERO; 2];
                        limbs[owner - 1] = limb;
                        self.results[owner].push_back(S::from_limbs(limbs));
                    }
                }
            }
            me => {
                let partner = 3 - me;
                for _ in 0..self.n_inputs[partner] {
                    self.results[partner].push_back(S::default());
                }
                // the owner's gamma comes from the generator shared with
                // the helper
                let slot = if me == 1 { 1 } else { 0 };
                self.prep_os.reserve::<R>(self.n_inputs[me]);
                for _ in 0..self.n_inputs[me] {
                    let gamma: R = p.prngs.gen(slot);
                    self.prep_os.store(gamma);
                    self.results[me].push_back(S::from_limbs([R::ZERO, gamma]));
                }
            }
        }
        let os = mem::take(&mut self.prep_os);
        p.store(&os)
    }

    pub fn finalize(&mut self, owner: usize) -> Result<S, Error> {
        self.results
            .get_mut(owner)
            .and_then(|r| r.pop_front())
            .ok_or(Error::Assertion("no prepared input left for this owner"))
    }
}

/// Online input protocol, run by the two online parties.
pub struct OnlineInput<R, S> {
    inputs: Vec<R>,
    gammas: VecDeque<R>,
    n_other: usize,
    send_os: Octets,
    recv_os: Octets,
    _share: PhantomData<S>,
}

impl<R, S> Default for OnlineInput<R, S> {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            gammas: VecDeque::new(),
            n_other: 0,
            send_os: Octets::new(),
            recv_os: Octets::new(),
            _share: PhantomData,
        }
    }
}

impl<R, S> OnlineInput<R, S>
where
    R: Ring,
    S: OnlineShare<R>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.inputs.clear();
        self.gammas.clear();
        self.n_other = 0;
        self.send_os.reset_write_head();
        self.recv_os.reset_write_head();
    }

    /// Contribute an own input value.
    pub fn add_mine(&mut self, value: R) {
        self.inputs.push(value);
    }

    /// Expect an input from the partner.
    pub fn add_other(&mut self) {
        self.n_other += 1;
    }

    pub async fn exchange(&mut self, p: &mut OnlineProtocol<R, S>) -> Result<(), Error> {
        let mut prep_os = p.tape.read_batch_of::<R>(self.inputs.len())?;
        self.send_os.reset_write_head();
        self.send_os.reserve::<R>(self.inputs.len());
        for input in &self.inputs {
            let gamma = prep_os.get::<R>()?;
            self.send_os.store(input.wrapping_sub(&gamma));
            self.gammas.push_back(gamma);
        }
        let recv = p
            .channels
            .exchange_buf(p.other(), self.send_os.clone())
            .await?;
        recv.require::<R>(self.n_other)?;
        self.recv_os = recv;
        if prep_os.left() != 0 {
            return Err(Error::Assertion("unused input preprocessing"));
        }
        self.inputs.clear();
        Ok(())
    }

    /// Next sharing of an input owned by `owner`.
    pub fn finalize(&mut self, owner: usize, p: &OnlineProtocol<R, S>) -> Result<S, Error> {
        if owner == p.my_num() {
            let gamma = self
                .gammas
                .pop_front()
                .ok_or(Error::Assertion("no own input left"))?;
            let masked = self.send_os.get::<R>()?;
            Ok(S::from_masked_input(masked, gamma))
        } else {
            self.n_other = self
                .n_other
                .checked_sub(1)
                .ok_or(Error::Assertion("no partner input left"))?;
            let masked = self.recv_os.get::<R>()?;
            Ok(S::from_masked_input(masked, R::ZERO))
        }
    }
}
