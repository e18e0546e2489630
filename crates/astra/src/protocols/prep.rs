//! Function-dependent preprocessing, run by all three parties.
//!
//! The helper (party 0) holds both mask limbs of every sharing and derives
//! all product correlations; parties 1 and 2 persist their tape entries for
//! the online phase. One message per multiplication batch travels from the
//! helper to party 2; everything else is drawn from the correlated
//! generators.
use crate::errors::Error;
use crate::octets::Octets;
use crate::prng::SharedPrngs;
use crate::protocols::{Channels, Stats, COMP_PLAYER, GEN_PLAYER};
use crate::ring::Ring;
use crate::share::{AstraPrepShare, PrepShare, TrioPrepShare};
use crate::tape::TapeWriter;
use crate::trunc::TruncPrTuple;
use rand::distributions::{Distribution, Standard};
use std::collections::VecDeque;
use std::mem;
use tracing::trace;

pub type AstraPrepProtocol<R> = PrepProtocol<R, AstraPrepShare<R>>;
pub type TrioPrepProtocol<R> = PrepProtocol<R, TrioPrepShare<R>>;

/// Per-protocol multiplication behaviour of the preprocessing phase. The
/// party-2 path is identical for Astra and Trio and lives in
/// [`PrepProtocol::exchange`].
pub trait PrepKind<R: Ring>: PrepShare<R> {
    /// Helper step for one product: derive the result mask limbs and append
    /// the correction for party 2 to `p.os`.
    fn prep_mul_p0(p: &mut PrepProtocol<R, Self>, input: R);
    /// Party-1 step for one product: derive the locally known limbs and
    /// append the tape entry to `p.os_prep`.
    fn prep_mul_p1(p: &mut PrepProtocol<R, Self>);
}

pub struct PrepProtocol<R: Ring, S> {
    pub(crate) channels: Channels,
    pub(crate) prngs: SharedPrngs,
    pub(crate) input0_prngs: SharedPrngs,
    tape: Option<TapeWriter>,
    input_pairs: Vec<(S, S)>,
    dot_inputs: Vec<R>,
    pub(crate) results: VecDeque<S>,
    gen_values: VecDeque<S>,
    pub(crate) os: Octets,
    pub(crate) os_prep: Octets,
    cs: Octets,
    stats: Stats,
}

impl<R, S> PrepProtocol<R, S>
where
    R: Ring,
    S: PrepKind<R>,
    Standard: Distribution<R>,
{
    /// `tape` must be given exactly for parties 1 and 2; the helper does not
    /// persist preprocessing.
    pub fn new(
        channels: Channels,
        prngs: SharedPrngs,
        input0_prngs: SharedPrngs,
        tape: Option<TapeWriter>,
    ) -> Result<Self, Error> {
        if channels.my_num() > 2 {
            return Err(Error::Configuration(format!(
                "party number {} out of range",
                channels.my_num()
            )));
        }
        if (channels.my_num() == 0) != tape.is_none() {
            return Err(Error::Configuration(
                "preprocessing tape required exactly for parties 1 and 2".into(),
            ));
        }
        Ok(Self {
            channels,
            prngs,
            input0_prngs,
            tape,
            input_pairs: Vec::new(),
            dot_inputs: Vec::new(),
            results: VecDeque::new(),
            gen_values: VecDeque::new(),
            os: Octets::new(),
            os_prep: Octets::new(),
            cs: Octets::new(),
            stats: Stats::default(),
        })
    }

    pub fn my_num(&self) -> usize {
        self.channels.my_num()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Append a batch to this party's tape; no-op on the helper.
    pub(crate) fn store(&mut self, os: &Octets) -> Result<(), Error> {
        match &mut self.tape {
            Some(tape) => tape.write_batch(os),
            None => Ok(()),
        }
    }

    fn store_prep(&mut self) -> Result<(), Error> {
        let os = mem::take(&mut self.os_prep);
        self.store(&os)
    }

    /// Initialize a multiplication round.
    pub fn init_mul(&mut self) {
        self.input_pairs.clear();
        self.dot_inputs.clear();
        self.results.clear();
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

    /// Finish the current dot product; it consumes one correlation and one
    /// exchange element no matter how many terms it has.
    pub fn next_dotprod(&mut self) {
        let mut sum = R::ZERO;
        match self.my_num() {
            0 => {
                for (x, y) in &self.input_pairs {
                    sum = sum.wrapping_add(&x.local_mul_p0(y));
                }
            }
            1 => {
                for (x, y) in &self.input_pairs {
                    sum = sum.wrapping_add(&x.local_mul_p1(y));
                }
            }
            _ => {
                for (x, y) in &self.input_pairs {
                    sum = sum.wrapping_add(&x.local_mul_p2(y));
                }
            }
        }
        self.dot_inputs.push(sum);
        self.input_pairs.clear();
        self.stats.dot_products += 1;
    }

    /// Run the multiplication round for everything prepared since
    /// [`Self::init_mul`].
    pub async fn exchange(&mut self) -> Result<(), Error> {
        if !self.results.is_empty() {
            return Err(Error::Assertion("previous multiplication round not consumed"));
        }
        let n = self.dot_inputs.len() + self.input_pairs.len();
        trace!(n, my_num = self.my_num(), "prep multiplication round");
        self.stats.rounds += 1;
        let dot_inputs = mem::take(&mut self.dot_inputs);
        let pairs = mem::take(&mut self.input_pairs);
        match self.my_num() {
            0 => {
                self.os.reset_write_head();
                self.os.reserve::<R>(n);
                for input in dot_inputs {
                    S::prep_mul_p0(self, input);
                }
                for (x, y) in &pairs {
                    S::prep_mul_p0(self, x.local_mul_p0(y));
                }
                let os = mem::take(&mut self.os);
                self.channels.send_buf(2, os).await?;
            }
            1 => {
                self.os_prep.reset_write_head();
                self.os_prep.reserve::<R>(2 * n);
                for _ in 0..n {
                    S::prep_mul_p1(self);
                }
                self.store_prep()?;
            }
            _ => {
                let mut os = self.channels.recv_buf(0).await?;
                os.require::<R>(n)?;
                self.os_prep.reset_write_head();
                self.os_prep.reserve::<R>(2 * n);
                for _ in 0..n {
                    let z: R = self.prngs.gen(0);
                    self.results.push_back(S::from_limbs([R::ZERO, z]));
                }
                for i in 0..n {
                    let gamma = os.get::<R>()?;
                    let z = self.results[i].limbs()[1];
                    self.os_prep.store(gamma);
                    self.os_prep.store(z);
                }
                self.store_prep()?;
            }
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

    /// A fresh random sharing, persisted to tape for the online parties.
    pub fn get_random(&mut self) -> Result<S, Error> {
        let limbs: [R; 2] = self.prngs.gen_pair();
        let res = S::from_rep3(limbs, self.my_num());
        let mut os = Octets::with_capacity(2 * R::BYTES);
        let [l0, l1] = res.limbs();
        os.store(l0);
        os.store(l1);
        self.store(&os)?;
        Ok(res)
    }

    /// `count` random sharings of `n_bits`-bit values, as one tape batch.
    pub fn randoms(&mut self, n_bits: usize, count: usize) -> Result<Vec<S>, Error> {
        let mask = R::ONE.wrapping_shl(n_bits).wrapping_sub(&R::ONE);
        let mut os = Octets::with_capacity(2 * count * R::BYTES);
        let mut res = Vec::with_capacity(count);
        for _ in 0..count {
            let drawn: [R; 2] = self.prngs.gen_pair();
            let limbs = [drawn[0] & mask, drawn[1] & mask];
            let share = S::from_rep3(limbs, self.my_num());
            let [l0, l1] = share.limbs();
            os.store(l0);
            os.store(l1);
            res.push(share);
        }
        self.store(&os)?;
        Ok(res)
    }

    /// Forward clear values to the online parties through the tape.
    pub fn forward_values(&mut self, values: &[R]) -> Result<(), Error> {
        let mut os = Octets::with_capacity(values.len() * R::BYTES);
        for v in values {
            os.store(*v);
        }
        self.store(&os)
    }

    /// Probabilistic truncation of a batch, dispatched on the gap class.
    pub async fn trunc_pr(
        &mut self,
        info: &TruncPrTuple<R>,
        source: &[S],
    ) -> Result<Vec<S>, Error> {
        if info.big_gap() {
            self.trunc_pr_big_gap(info.m, source).await
        } else {
            self.trunc_pr_small_gap(info, source).await
        }
    }

    /// One-round truncation for values with a big gap: the helper masks the
    /// truncated mask sum for the computing party; party 2 draws the same
    /// mask from its shared generator.
    pub async fn trunc_pr_big_gap(&mut self, m: usize, source: &[S]) -> Result<Vec<S>, Error> {
        let size = source.len();
        self.stats.trunc_pr_count += size;
        self.stats.trunc_rounds += 1;
        let mut dest = Vec::with_capacity(size);
        match self.my_num() {
            GEN_PLAYER => {
                let mut cs = Octets::with_capacity(size * R::BYTES);
                for x in source {
                    let r: R = self.prngs.gen(1);
                    let y0 = x
                        .sum()
                        .wrapping_neg()
                        .wrapping_shr(m)
                        .wrapping_neg()
                        .wrapping_sub(&r);
                    cs.store(y0);
                    dest.push(S::from_limbs([y0, r]));
                }
                self.channels.send_buf(COMP_PLAYER, cs).await?;
            }
            COMP_PLAYER => {
                let mut cs = self.channels.recv_buf(GEN_PLAYER).await?;
                cs.require::<R>(size)?;
                let mut os = Octets::with_capacity(size * R::BYTES);
                for _ in 0..size {
                    let v = cs.get::<R>()?;
                    os.store(v);
                    dest.push(S::from_limbs([R::ZERO, v]));
                }
                self.store(&os)?;
            }
            _ => {
                let mut cs = Octets::with_capacity(size * R::BYTES);
                for _ in 0..size {
                    let v: R = self.prngs.gen(0);
                    cs.store(v);
                    dest.push(S::from_limbs([R::ZERO, v]));
                }
                self.store(&cs)?;
            }
        }
        Ok(dest)
    }

    /// Correction-based truncation for values without a big gap. Composes
    /// the input0 subprotocol sharing the helper's truncated offset, a
    /// reduced multiplication of the two relevant carry bits, and a local
    /// adjustment.
    pub async fn trunc_pr_small_gap(
        &mut self,
        info: &TruncPrTuple<R>,
        source: &[S],
    ) -> Result<Vec<S>, Error> {
        let size = source.len();
        self.stats.trunc_pr_count += size;
        self.stats.trunc_rounds += 1;
        self.init_mul();
        self.gen_values.clear();
        self.init_reduced_mul(size).await?;
        self.init_input0(size);

        let mut dest = Vec::with_capacity(size);
        let generate = self.my_num() == GEN_PLAYER;
        for y in source {
            let mut r_msb = R::ZERO;
            if generate {
                let r = y
                    .sum()
                    .wrapping_add(&info.add_before())
                    .wrapping_sub(&R::ONE);
                r_msb = r.msb();
                self.pre_input0(r.wrapping_shr(info.m));
            }
            let (r_dprime, c_dprime, prod) = self.pre_reduced_mul(r_msb, R::ZERO)?;
            let x = prod
                .wrapping_sub(&r_dprime.wrapping_add(&c_dprime))
                .shl(R::BITS - info.m);
            dest.push(x);
        }

        self.exchange_reduced_mul(size).await?;
        self.exchange_input0(size).await?;

        for x in &mut dest {
            let r_prime = self.post_input0()?;
            let (_, res_clear) = self.post_reduced_mul();
            *x = x.wrapping_add(&r_prime).wrapping_sub(&S::constant(
                info.subtract_after().wrapping_sub(&R::ONE),
            ));
            let mut limbs = x.limbs();
            limbs[0] = limbs[0].wrapping_add(&info.correction_shift(res_clear));
            *x = S::from_limbs(limbs);
        }

        self.finalize_input0(size)?;
        Ok(dest)
    }

    /// Lift a binary-shared vector into arithmetic sharings, bit by bit.
    /// Each source share contributes its limbs as blocks of `R::BITS` bits
    /// under the XOR sharing of the binary domain.
    pub async fn unsplit(&mut self, source: &[S], n_bits: usize) -> Result<Vec<S>, Error> {
        if source.len() * R::BITS < n_bits {
            return Err(Error::Assertion("unsplit source too short for bit count"));
        }
        self.init_reduced_mul(n_bits).await?;
        let two = R::ONE.wrapping_add(&R::ONE);
        let mut dest = Vec::with_capacity(n_bits);
        if self.my_num() == 0 {
            'blocks: for x in source {
                let [l0, l1] = x.limbs();
                let block = l0 ^ l1;
                for j in 0..R::BITS {
                    if dest.len() == n_bits {
                        break 'blocks;
                    }
                    let bit = block.get_bit(j);
                    let (a, _b, c) = self.pre_reduced_mul(bit, R::ZERO)?;
                    dest.push(a.wrapping_sub(&c.mul_clear(two)));
                }
            }
        } else {
            for _ in 0..n_bits {
                let (a, _b, c) = self.pre_reduced_mul(R::ZERO, R::ZERO)?;
                let lifted = a.limbs()[1].wrapping_sub(&c.limbs()[1].wrapping_mul(&two));
                dest.push(S::from_limbs([R::ZERO, lifted]));
            }
        }
        self.exchange_reduced_mul(n_bits).await?;
        Ok(dest)
    }

    /// Start a reduced-multiplication batch, where one operand is a bit
    /// known to the helper in the mask only.
    pub(crate) async fn init_reduced_mul(&mut self, n_mul: usize) -> Result<(), Error> {
        self.os_prep.reset_write_head();
        self.os.reset_write_head();
        self.os.reserve::<R>(n_mul);
        self.os_prep.reserve::<R>(2 * n_mul);
        if self.my_num() == 2 {
            self.os = self.channels.recv_buf(0).await?;
            self.os.require::<R>(n_mul)?;
        }
        Ok(())
    }

    /// One reduced product `a · b` where the helper supplies `aa` as the
    /// value of `a`. Returns `(a, b, c)` with `c = a·b` up to the exchanged
    /// completion.
    pub(crate) fn pre_reduced_mul(&mut self, aa: R, _bb: R) -> Result<(S, S, S), Error> {
        match self.my_num() {
            0 => {
                let a0: R = self.prngs.gen(0);
                let a1 = aa.wrapping_sub(&a0);
                self.os.store(a1);
                let a = S::from_limbs([a0, a1]);
                let c = S::from_limbs(self.prngs.gen_pair());
                Ok((a, S::default(), c))
            }
            1 => {
                let a1: R = self.prngs.gen(1);
                let c1: R = self.prngs.gen(1);
                self.os_prep.store(a1);
                self.os_prep.store(c1);
                Ok((
                    S::from_limbs([R::ZERO, a1]),
                    S::default(),
                    S::from_limbs([R::ZERO, c1]),
                ))
            }
            _ => {
                let a1 = self.os.get::<R>()?;
                let c1: R = self.prngs.gen(0);
                self.os_prep.store(a1);
                self.os_prep.store(c1);
                Ok((
                    S::from_limbs([R::ZERO, a1]),
                    S::default(),
                    S::from_limbs([R::ZERO, c1]),
                ))
            }
        }
    }

    pub(crate) async fn exchange_reduced_mul(&mut self, _n_mul: usize) -> Result<(), Error> {
        if self.my_num() == 0 {
            let os = mem::take(&mut self.os);
            self.channels.send_buf(2, os).await?;
        }
        if self.my_num() == 2 && self.os.left() != 0 {
            return Err(Error::Assertion("unused data in reduced multiplication"));
        }
        self.store_prep()
    }

    pub(crate) fn post_reduced_mul(&mut self) -> (S, R) {
        // prep shares carry no masked part to complete
        (S::default(), R::ZERO)
    }

    /// Start an input0 batch: the helper shares values it knows in clear.
    /// Uses the dedicated second generator pair.
    pub(crate) fn init_input0(&mut self, n_inputs: usize) {
        self.cs.reset_write_head();
        self.cs.reserve::<R>(n_inputs);
    }

    /// Helper-side step sharing one value.
    pub(crate) fn pre_input0(&mut self, value: R) {
        let r1: R = self.input0_prngs.gen(1);
        let r0 = value.wrapping_sub(&r1);
        self.gen_values.push_back(S::from_limbs([r0, r1]));
        self.cs.store(r0);
    }

    pub(crate) async fn exchange_input0(&mut self, n_inputs: usize) -> Result<(), Error> {
        match self.my_num() {
            0 => {
                if self.gen_values.len() != n_inputs {
                    return Err(Error::Assertion("input0 batch size mismatch"));
                }
                let cs = mem::take(&mut self.cs);
                self.channels.send_buf(1, cs).await?;
            }
            1 => {
                self.cs = self.channels.recv_buf(0).await?;
                self.cs.require::<R>(n_inputs)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn post_input0(&mut self) -> Result<S, Error> {
        match self.my_num() {
            0 => self
                .gen_values
                .pop_front()
                .ok_or(Error::Assertion("input0 values consumed twice")),
            1 => {
                let v = self.cs.get::<R>()?;
                Ok(S::from_limbs([R::ZERO, v]))
            }
            _ => {
                let r1: R = self.input0_prngs.gen(0);
                self.cs.store(r1);
                Ok(S::from_limbs([R::ZERO, r1]))
            }
        }
    }

    pub(crate) fn finalize_input0(&mut self, n_inputs: usize) -> Result<(), Error> {
        if self.my_num() != 0 {
            self.cs.reset_read_head();
            self.cs.require::<R>(n_inputs)?;
            let cs = mem::take(&mut self.cs);
            self.store(&cs)?;
        }
        if !self.gen_values.is_empty() {
            return Err(Error::Assertion("unconsumed input0 values"));
        }
        Ok(())
    }
}

impl<R> PrepKind<R> for AstraPrepShare<R>
where
    R: Ring,
    Standard: Distribution<R>,
{
    fn prep_mul_p0(p: &mut PrepProtocol<R, Self>, input: R) {
        let z0: R = p.prngs.gen(0);
        let z1: R = p.prngs.gen(1);
        let gamma: R = p.prngs.gen(0);
        p.os.store(input.wrapping_sub(&gamma));
        p.results.push_back(AstraPrepShare([z0, z1]));
    }

    fn prep_mul_p1(p: &mut PrepProtocol<R, Self>) {
        let z1: R = p.prngs.gen(1);
        let gamma: R = p.prngs.gen(1);
        p.os_prep.store(gamma);
        p.os_prep.store(z1);
        p.results.push_back(AstraPrepShare([R::ZERO, z1]));
    }
}

impl<R> PrepKind<R> for TrioPrepShare<R>
where
    R: Ring,
    Standard: Distribution<R>,
{
    fn prep_mul_p0(p: &mut PrepProtocol<R, Self>, input: R) {
        let r01: R = p.prngs.gen(0);
        p.os.store(input.wrapping_add(&r01));
        let z0: R = p.prngs.gen(0);
        let z1: R = p.prngs.gen(1);
        p.results.push_back(TrioPrepShare([z0, z1]));
    }

    fn prep_mul_p1(p: &mut PrepProtocol<R, Self>) {
        let r01: R = p.prngs.gen(1);
        let z1: R = p.prngs.gen(1);
        p.results.push_back(TrioPrepShare([R::ZERO, z1]));
        p.os_prep.store(r01);
        p.os_prep.store(z1);
    }
}
