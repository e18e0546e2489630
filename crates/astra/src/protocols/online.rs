//! Online evaluation, run by parties 1 and 2 on the preprocessing tapes.
//!
//! The helper is absent: every round consumes tape entries written during
//! preprocessing and performs exactly one pass-around exchange between the
//! two online parties. Astra and Trio differ in how the exchanged element
//! is formed and completed; both enter through [`OnlineShare`].
use crate::errors::Error;
use crate::octets::Octets;
use crate::protocols::{Channels, Stats};
use crate::ring::Ring;
use crate::share::{AstraShare, MaskedShare, TrioShare};
use crate::tape::{TapeReader, TapeWriter};
use crate::trunc::TruncPrTuple;
use std::collections::VecDeque;
use std::mem;
use std::path::PathBuf;
use tracing::trace;

pub type Astra<R> = OnlineProtocol<R, AstraShare<R>>;
pub type Trio<R> = OnlineProtocol<R, TrioShare<R>>;

/// Per-protocol multiplication behaviour of the online phase.
pub trait OnlineShare<R: Ring>: MaskedShare<R> {
    /// Whether a mixed round processes prepared pairs before dot products.
    const PAIRS_FIRST: bool;

    /// Consume one tape entry, append this party's message element to
    /// `p.os` and push the pending result.
    fn pre_mul(p: &mut OnlineProtocol<R, Self>, input: R) -> Result<(), Error>;

    /// Complete result `idx` with the element received from the peer.
    fn finish_mul(p: &mut OnlineProtocol<R, Self>, idx: usize, recv: R) -> Result<(), Error>;

    /// One reduced product `a · b`, with `b = bb` entering as a public
    /// constant. Returns `(a, b, c)`; `c`'s masked part is completed by
    /// [`Self::post_reduced_mul`].
    fn pre_reduced_mul(
        p: &mut OnlineProtocol<R, Self>,
        aa: R,
        bb: R,
    ) -> Result<(Self, Self, Self), Error>;

    /// Next reduced result together with the peer's masked-part summand.
    fn post_reduced_mul(p: &mut OnlineProtocol<R, Self>) -> Result<(Self, R), Error>;

    /// The masked bit block this share contributes to unsplit.
    fn unsplit_block(&self) -> R;
}

pub struct OnlineProtocol<R: Ring, S> {
    pub(crate) channels: Channels,
    pub(crate) tape: TapeReader,
    outputs_path: Option<PathBuf>,
    outputs: Option<TapeWriter>,
    input_pairs: Vec<(S, S)>,
    dot_inputs: Vec<R>,
    pub(crate) results: VecDeque<S>,
    pub(crate) pending: VecDeque<R>,
    pub(crate) os: Octets,
    pub(crate) os_prep: Octets,
    pub(crate) recv_os: Octets,
    cs_prep: Octets,
    stats: Stats,
}

impl<R, S> OnlineProtocol<R, S>
where
    R: Ring,
    S: OnlineShare<R>,
{
    pub fn new(
        channels: Channels,
        tape: TapeReader,
        outputs_path: Option<PathBuf>,
    ) -> Result<Self, Error> {
        if !matches!(channels.my_num(), 1 | 2) {
            return Err(Error::Configuration(format!(
                "online party number must be 1 or 2, got {}",
                channels.my_num()
            )));
        }
        Ok(Self {
            channels,
            tape,
            outputs_path,
            outputs: None,
            input_pairs: Vec::new(),
            dot_inputs: Vec::new(),
            results: VecDeque::new(),
            pending: VecDeque::new(),
            os: Octets::new(),
            os_prep: Octets::new(),
            recv_os: Octets::new(),
            cs_prep: Octets::new(),
            stats: Stats::default(),
        })
    }

    pub fn my_num(&self) -> usize {
        self.channels.my_num()
    }

    /// The other online party.
    pub fn other(&self) -> usize {
        3 - self.my_num()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Initialize a multiplication round.
    pub fn init_mul(&mut self) {
        self.input_pairs.clear();
        self.dot_inputs.clear();
        self.results.clear();
        self.pending.clear();
    }

    pub fn prepare_mul(&mut self, x: S, y: S) {
        self.input_pairs.push((x, y));
    }

    /// Initialize a dot product round.
    pub fn init_dotprod(&mut self) {
        self.init_mul();
    }

    /// Add an operand pair to the current dot product.
    pub fn prepare_dotprod(&mut self, x: S, y: S) {
        self.prepare_mul(x, y);
    }

    /// Finish the current dot product.
    pub fn next_dotprod(&mut self) {
        let pairs = mem::take(&mut self.input_pairs);
        let mut sum = R::ZERO;
        for input in self.local_muls(&pairs) {
            sum = sum.wrapping_add(&input);
        }
        self.dot_inputs.push(sum);
        self.stats.dot_products += 1;
    }

    /// This party's multiplication summands, role-matched once per batch.
    fn local_muls(&self, pairs: &[(S, S)]) -> Vec<R> {
        if self.my_num() == 1 {
            pairs.iter().map(|(x, y)| x.local_mul_p1(y)).collect()
        } else {
            pairs.iter().map(|(x, y)| x.local_mul_p2(y)).collect()
        }
    }

    /// Run the multiplication round: consume `2·n` tape limbs, one
    /// pass-around exchange, complete all masked parts.
    pub async fn exchange(&mut self) -> Result<(), Error> {
        if !self.results.is_empty() {
            return Err(Error::Assertion("previous multiplication round not consumed"));
        }
        let n = self.dot_inputs.len() + self.input_pairs.len();
        trace!(n, my_num = self.my_num(), "online multiplication round");
        self.stats.rounds += 1;

        self.os_prep = self.tape.read_batch_of::<R>(2 * n)?;
        self.os.reset_write_head();
        self.os.reserve::<R>(n);
        self.pending.clear();

        let dots = mem::take(&mut self.dot_inputs);
        let pairs = mem::take(&mut self.input_pairs);
        let pair_muls = self.local_muls(&pairs);
        let inputs: Vec<R> = if S::PAIRS_FIRST {
            pair_muls.into_iter().chain(dots).collect()
        } else {
            dots.into_iter().chain(pair_muls).collect()
        };
        for input in inputs {
            S::pre_mul(self, input)?;
        }

        let os = mem::take(&mut self.os);
        let recv = self.channels.exchange_buf(self.other(), os).await?;
        recv.require::<R>(n)?;
        self.recv_os = recv;
        for i in 0..n {
            let v = self.recv_os.get::<R>()?;
            S::finish_mul(self, i, v)?;
        }

        if self.os_prep.left() != 0 {
            return Err(Error::Assertion("unused preprocessing in batch"));
        }
        Ok(())
    }

    /// Get the next multiplication result.
    pub fn finalize_mul(&mut self) -> Result<S, Error> {
        self.results
            .pop_front()
            .ok_or(Error::Assertion("no multiplication result left"))
    }

    pub fn finalize_dotprod(&mut self, _length: usize) -> Result<S, Error> {
        self.finalize_mul()
    }

    /// The random sharing produced during preprocessing.
    pub fn get_random(&mut self) -> Result<S, Error> {
        let mut os = self.tape.read_batch_of::<R>(2)?;
        let l0 = os.get::<R>()?;
        let l1 = os.get::<R>()?;
        if os.left() != 0 {
            return Err(Error::Assertion("oversized random batch"));
        }
        Ok(S::from_limbs([l0, l1]))
    }

    /// `count` random sharings produced during preprocessing.
    pub fn randoms(&mut self, count: usize) -> Result<Vec<S>, Error> {
        let mut os = self.tape.read_batch_of::<R>(2 * count)?;
        let mut res = Vec::with_capacity(count);
        for _ in 0..count {
            let l0 = os.get::<R>()?;
            let l1 = os.get::<R>()?;
            res.push(S::from_limbs([l0, l1]));
        }
        Ok(res)
    }

    /// Clear values the preprocessing forwarded through the tape.
    pub fn read_forwarded(&mut self, count: usize) -> Result<Vec<R>, Error> {
        let mut os = self.tape.read_batch_of::<R>(count)?;
        let mut res = Vec::with_capacity(count);
        for _ in 0..count {
            res.push(os.get::<R>()?);
        }
        Ok(res)
    }

    /// Persist reconstructed outputs; only party 1 writes the file.
    pub fn write_outputs(&mut self, values: &[R]) -> Result<(), Error> {
        if self.my_num() != 1 {
            return Ok(());
        }
        if self.outputs.is_none() {
            let path = self.outputs_path.clone().ok_or(Error::Configuration(
                "no outputs path configured for party 1".into(),
            ))?;
            self.outputs = Some(TapeWriter::create(path, self.my_num(), 0)?);
        }
        let mut os = Octets::with_capacity(values.len() * R::BYTES);
        for v in values {
            os.store(*v);
        }
        self.outputs
            .as_mut()
            .ok_or(Error::Assertion("outputs file vanished"))?
            .write_batch(&os)
    }

    /// Probabilistic truncation of a batch, dispatched on the gap class.
    pub async fn trunc_pr(
        &mut self,
        info: &TruncPrTuple<R>,
        source: &[S],
    ) -> Result<Vec<S>, Error> {
        if info.big_gap() {
            self.trunc_pr_big_gap(info.m, source)
        } else {
            self.trunc_pr_small_gap(info, source).await
        }
    }

    /// Big-gap truncation: shift the masked value locally, take the
    /// truncated mask from the tape. No communication.
    pub fn trunc_pr_big_gap(&mut self, m: usize, source: &[S]) -> Result<Vec<S>, Error> {
        let size = source.len();
        self.stats.trunc_pr_count += size;
        self.stats.trunc_rounds += 1;
        let mut cs = self.tape.read_batch_of::<R>(size)?;
        let mut dest = Vec::with_capacity(size);
        for x in source {
            let mut y = S::default();
            y.set_neg_lambda(cs.get::<R>()?);
            y.set_common_m(x.common_m().wrapping_shr(m));
            dest.push(y);
        }
        if cs.left() != 0 {
            return Err(Error::Assertion("oversized truncation batch"));
        }
        Ok(dest)
    }

    /// Small-gap truncation after Mohassel-Zhang: truncate the masked value
    /// locally, fix it up with the helper's shared offset and the carry
    /// product from a reduced multiplication.
    pub async fn trunc_pr_small_gap(
        &mut self,
        info: &TruncPrTuple<R>,
        source: &[S],
    ) -> Result<Vec<S>, Error> {
        let size = source.len();
        self.stats.trunc_pr_count += size;
        self.stats.trunc_rounds += 1;
        self.init_mul();
        self.init_reduced_mul(size)?;

        let mut dest = Vec::with_capacity(size);
        for y in source {
            let c = y.common_m();
            let c_prime = S::from_limbs([c.wrapping_shr(info.m), R::ZERO]);
            let c_msb = c.msb();
            let (r_dprime, c_dprime, prod) = S::pre_reduced_mul(self, R::ZERO, c_msb)?;
            let x = c_prime.wrapping_add(
                &prod
                    .wrapping_sub(&r_dprime.wrapping_add(&c_dprime))
                    .shl(R::BITS - info.m),
            );
            dest.push(x);
        }

        self.exchange_reduced_mul(size).await?;
        self.exchange_input0(size)?;

        for x in &mut dest {
            let r_prime = self.post_input0()?;
            let (_, res_clear) = S::post_reduced_mul(self)?;
            *x = x.wrapping_add(&r_prime).wrapping_sub(&S::constant(
                info.subtract_after().wrapping_sub(&R::ONE),
            ));
            let mut limbs = x.limbs();
            limbs[0] = limbs[0].wrapping_add(&info.correction_shift(res_clear));
            *x = S::from_limbs(limbs);
        }

        Ok(dest)
    }

    /// Lift a binary-shared vector into arithmetic sharings: per bit, one
    /// reduced multiplication with the helper's mask sharing, then
    /// `a + b - 2ab`.
    pub async fn unsplit(&mut self, source: &[S], n_bits: usize) -> Result<Vec<S>, Error> {
        if source.len() * R::BITS < n_bits {
            return Err(Error::Assertion("unsplit source too short for bit count"));
        }
        self.init_reduced_mul(n_bits)?;
        let two = R::ONE.wrapping_add(&R::ONE);
        let mut lifted = 0;
        'blocks: for x in source {
            let block = x.unsplit_block();
            for j in 0..R::BITS {
                if lifted == n_bits {
                    break 'blocks;
                }
                let bit = block.get_bit(j);
                let (a, b, c) = S::pre_reduced_mul(self, R::ZERO, bit)?;
                let val = a.wrapping_add(&b).wrapping_sub(&c.mul_clear(two));
                *self
                    .results
                    .back_mut()
                    .ok_or(Error::Assertion("reduced multiplication out of sync"))? = val;
                lifted += 1;
            }
        }

        self.exchange_reduced_mul(n_bits).await?;

        let mut dest = Vec::with_capacity(n_bits);
        for _ in 0..n_bits {
            let (share, mc) = S::post_reduced_mul(self)?;
            let mut limbs = share.limbs();
            limbs[0] = limbs[0].wrapping_sub(&mc.wrapping_mul(&two));
            dest.push(S::from_limbs(limbs));
        }

        if self.recv_os.left() != 0 || self.os_prep.left() != 0 {
            return Err(Error::Assertion("unused data after unsplit"));
        }
        Ok(dest)
    }

    /// Start a reduced-multiplication batch: `2·n` tape limbs, fresh
    /// buffers.
    pub(crate) fn init_reduced_mul(&mut self, n_mul: usize) -> Result<(), Error> {
        self.os_prep = self.tape.read_batch_of::<R>(2 * n_mul)?;
        self.os.reset_write_head();
        self.os.reserve::<R>(n_mul);
        self.results.clear();
        self.pending.clear();
        Ok(())
    }

    pub(crate) async fn exchange_reduced_mul(&mut self, n_mul: usize) -> Result<(), Error> {
        let os = mem::take(&mut self.os);
        let recv = self.channels.exchange_buf(self.other(), os).await?;
        recv.require::<R>(n_mul)?;
        self.recv_os = recv;
        Ok(())
    }

    /// Read the input0 batch the preprocessing placed on the tape.
    pub(crate) fn exchange_input0(&mut self, n_inputs: usize) -> Result<(), Error> {
        self.cs_prep = self.tape.read_batch_of::<R>(n_inputs)?;
        Ok(())
    }

    pub(crate) fn post_input0(&mut self) -> Result<S, Error> {
        Ok(S::from_input0(self.cs_prep.get::<R>()?))
    }
}

impl<R: Ring> OnlineShare<R> for AstraShare<R> {
    const PAIRS_FIRST: bool = false;

    fn pre_mul(p: &mut OnlineProtocol<R, Self>, input: R) -> Result<(), Error> {
        let gamma = p.os_prep.get::<R>()?;
        let neg_lambda = p.os_prep.get::<R>()?;
        let m_z = input.wrapping_sub(&neg_lambda).wrapping_add(&gamma);
        p.os.store(m_z);
        p.results.push_back(AstraShare {
            m: m_z,
            neg_lambda,
        });
        Ok(())
    }

    fn finish_mul(p: &mut OnlineProtocol<R, Self>, idx: usize, recv: R) -> Result<(), Error> {
        let res = p
            .results
            .get_mut(idx)
            .ok_or(Error::Assertion("multiplication result out of range"))?;
        res.m = res.m.wrapping_add(&recv);
        Ok(())
    }

    fn pre_reduced_mul(
        p: &mut OnlineProtocol<R, Self>,
        _aa: R,
        bb: R,
    ) -> Result<(Self, Self, Self), Error> {
        let a = AstraShare {
            m: R::ZERO,
            neg_lambda: p.os_prep.get::<R>()?,
        };
        let c_lambda = p.os_prep.get::<R>()?;
        let m_i = bb.wrapping_mul(&a.neg_lambda).wrapping_sub(&c_lambda);
        p.os.store(m_i);
        let b = AstraShare::constant(bb);
        let c = AstraShare {
            m: m_i,
            neg_lambda: c_lambda,
        };
        p.results.push_back(AstraShare::default());
        Ok((a, b, c))
    }

    fn post_reduced_mul(p: &mut OnlineProtocol<R, Self>) -> Result<(Self, R), Error> {
        let share = p
            .results
            .pop_front()
            .ok_or(Error::Assertion("no reduced multiplication result left"))?;
        let recv = p.recv_os.get::<R>()?;
        Ok((share, recv))
    }

    fn unsplit_block(&self) -> R {
        self.m
    }
}

impl<R: Ring> OnlineShare<R> for TrioShare<R> {
    const PAIRS_FIRST: bool = true;

    fn pre_mul(p: &mut OnlineProtocol<R, Self>, input: R) -> Result<(), Error> {
        let v = input.wrapping_add(&p.os_prep.get::<R>()?);
        let neg_lambda = p.os_prep.get::<R>()?;
        if p.my_num() == 1 {
            p.os.store(v.wrapping_add(&neg_lambda));
        } else {
            p.os.store(v.wrapping_sub(&neg_lambda));
        }
        p.pending.push_back(v);
        p.results.push_back(TrioShare {
            limbs: [R::ZERO, neg_lambda],
        });
        Ok(())
    }

    fn finish_mul(p: &mut OnlineProtocol<R, Self>, idx: usize, recv: R) -> Result<(), Error> {
        let v = p
            .pending
            .pop_front()
            .ok_or(Error::Assertion("multiplication summand out of sync"))?;
        let m = if p.my_num() == 1 {
            recv.wrapping_sub(&v)
        } else {
            v.wrapping_sub(&recv)
        };
        let res = p
            .results
            .get_mut(idx)
            .ok_or(Error::Assertion("multiplication result out of range"))?;
        res.limbs[0] = m;
        Ok(())
    }

    fn pre_reduced_mul(
        p: &mut OnlineProtocol<R, Self>,
        _aa: R,
        bb: R,
    ) -> Result<(Self, Self, Self), Error> {
        let a_lambda = p.os_prep.get::<R>()?;
        let c_lambda = p.os_prep.get::<R>()?;
        let a = TrioShare {
            limbs: [a_lambda, a_lambda],
        };
        let b = TrioShare::constant(bb);
        let c = TrioShare {
            limbs: [R::ZERO, c_lambda],
        };
        if p.my_num() == 1 {
            let v = b.m().wrapping_mul(&a.lambda());
            p.os.store(v.wrapping_add(&c.neg_lambda()));
            p.pending.push_back(v);
        } else {
            let v = a.m().wrapping_mul(&b.m());
            p.os.store(v.wrapping_sub(&c.neg_lambda()));
            p.pending.push_back(v);
        }
        p.results.push_back(TrioShare::default());
        Ok((a, b, c))
    }

    fn post_reduced_mul(p: &mut OnlineProtocol<R, Self>) -> Result<(Self, R), Error> {
        let share = p
            .results
            .pop_front()
            .ok_or(Error::Assertion("no reduced multiplication result left"))?;
        let v = p
            .pending
            .pop_front()
            .ok_or(Error::Assertion("reduced multiplication summand out of sync"))?;
        let recv = p.recv_os.get::<R>()?;
        let second = if p.my_num() == 1 {
            recv.wrapping_sub(&v)
        } else {
            v.wrapping_sub(&recv)
        };
        Ok((share, second))
    }

    fn unsplit_block(&self) -> R {
        self.limbs[0] ^ self.limbs[1]
    }
}
