//! Secret-share representations and the per-party local multiplication
//! formulas.
//!
//! Every sharing of x consists of a masked value `m = x + λ` common to the
//! two online parties and an additive split of the mask, stored negated:
//! `x = m + neg_lambda⁽¹⁾ + neg_lambda⁽²⁾`. The helper (party 0) holds both
//! `neg_lambda` limbs and never sees `m`. Astra and Trio differ only in the
//! limb layout: Trio's limb 0 redundantly stores `m + neg_lambda` so that
//! `common_m = limb0 - limb1`, which lets some local products vanish and
//! enables one-directional messaging.
use crate::ring::Ring;
use std::fmt::Debug;

/// Two-limb storage shared by all share representations.
pub trait Limbs<R: Ring>:
    Copy + Clone + Debug + Default + PartialEq + Eq + Send + Sync + 'static
{
    fn from_limbs(limbs: [R; 2]) -> Self;
    fn limbs(&self) -> [R; 2];

    fn wrapping_add(&self, other: &Self) -> Self {
        let [a0, a1] = self.limbs();
        let [b0, b1] = other.limbs();
        Self::from_limbs([a0.wrapping_add(&b0), a1.wrapping_add(&b1)])
    }

    fn wrapping_sub(&self, other: &Self) -> Self {
        let [a0, a1] = self.limbs();
        let [b0, b1] = other.limbs();
        Self::from_limbs([a0.wrapping_sub(&b0), a1.wrapping_sub(&b1)])
    }

    fn wrapping_neg(&self) -> Self {
        let [a0, a1] = self.limbs();
        Self::from_limbs([a0.wrapping_neg(), a1.wrapping_neg()])
    }

    /// Multiplication by a clear scalar, local by linearity.
    fn mul_clear(&self, c: R) -> Self {
        let [a0, a1] = self.limbs();
        Self::from_limbs([a0.wrapping_mul(&c), a1.wrapping_mul(&c)])
    }

    fn shl(&self, n: usize) -> Self {
        let [a0, a1] = self.limbs();
        Self::from_limbs([a0.wrapping_shl(n), a1.wrapping_shl(n)])
    }
}

/// View of a sharing held by an online party (1 or 2).
pub trait MaskedShare<R: Ring>: Limbs<R> {
    /// Directory component of the preprocessing storage location.
    const PROTOCOL: &'static str;

    fn m(&self) -> R {
        self.limbs()[0]
    }

    fn neg_lambda(&self) -> R {
        self.limbs()[1]
    }

    fn lambda(&self) -> R {
        self.neg_lambda().wrapping_neg()
    }

    fn set_neg_lambda(&mut self, v: R) {
        let [l0, _] = self.limbs();
        *self = Self::from_limbs([l0, v]);
    }

    /// The masked value common to both online parties.
    fn common_m(&self) -> R;
    fn set_common_m(&mut self, v: R);

    /// Constants are embedded with `m = c` and a zero mask.
    fn constant(c: R) -> Self {
        Self::from_limbs([c, R::ZERO])
    }

    /// Sharing resulting from the owner's masked input `x - γ`.
    fn from_masked_input(masked: R, gamma: R) -> Self;

    /// Sharing of the small-gap correction read from the input0 tape entry.
    fn from_input0(v: R) -> Self;

    /// Summand this party contributes when opening the sharing.
    fn open_summand(&self, my_num: usize) -> R;

    fn local_mul_p1(&self, other: &Self) -> R;
    fn local_mul_p2(&self, other: &Self) -> R;
}

/// View of a sharing during the preprocessing phase. The helper's limbs are
/// the two `neg_lambda` shares; parties 1 and 2 carry their own limb in
/// slot 1.
pub trait PrepShare<R: Ring>: Limbs<R> {
    const PROTOCOL: &'static str;

    fn sum(&self) -> R {
        let [a0, a1] = self.limbs();
        a0.wrapping_add(&a1)
    }

    /// Reorder a replicated two-limb sharing into this party's prep layout.
    fn from_rep3(limbs: [R; 2], my_num: usize) -> Self;

    /// Prep shares are not real shares; constants carry no data.
    fn constant(_c: R) -> Self {
        Self::default()
    }

    fn local_mul_p0(&self, other: &Self) -> R;
    fn local_mul_p1(&self, other: &Self) -> R;
    fn local_mul_p2(&self, other: &Self) -> R;
}

/// Index of the replicated limb backing arithmetic limb `i` on `my_num`.
pub(crate) fn rep_index(i: usize, my_num: usize) -> usize {
    if my_num == 0 {
        i
    } else if i == 0 {
        // m
        my_num - 1
    } else {
        // lambda
        2 - my_num
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AstraShare<R> {
    pub(crate) m: R,
    pub(crate) neg_lambda: R,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AstraPrepShare<R>(pub(crate) [R; 2]);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrioShare<R> {
    pub(crate) limbs: [R; 2],
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrioPrepShare<R>(pub(crate) [R; 2]);

impl<R: Ring> Limbs<R> for AstraShare<R> {
    fn from_limbs(limbs: [R; 2]) -> Self {
        Self {
            m: limbs[0],
            neg_lambda: limbs[1],
        }
    }

    fn limbs(&self) -> [R; 2] {
        [self.m, self.neg_lambda]
    }
}

impl<R: Ring> MaskedShare<R> for AstraShare<R> {
    const PROTOCOL: &'static str = "astra";

    fn common_m(&self) -> R {
        self.m
    }

    fn set_common_m(&mut self, v: R) {
        self.m = v;
    }

    fn from_masked_input(masked: R, gamma: R) -> Self {
        Self {
            m: masked,
            neg_lambda: gamma,
        }
    }

    fn from_input0(v: R) -> Self {
        Self {
            m: R::ZERO,
            neg_lambda: v,
        }
    }

    fn open_summand(&self, my_num: usize) -> R {
        if my_num == 1 {
            self.m.wrapping_add(&self.neg_lambda)
        } else {
            self.neg_lambda
        }
    }

    fn local_mul_p1(&self, other: &Self) -> R {
        self.m
            .wrapping_mul(&other.neg_lambda)
            .wrapping_add(&other.m.wrapping_mul(&self.neg_lambda))
    }

    fn local_mul_p2(&self, other: &Self) -> R {
        self.m
            .wrapping_mul(&other.m)
            .wrapping_add(&self.local_mul_p1(other))
    }
}

impl<R: Ring> Limbs<R> for AstraPrepShare<R> {
    fn from_limbs(limbs: [R; 2]) -> Self {
        Self(limbs)
    }

    fn limbs(&self) -> [R; 2] {
        self.0
    }
}

impl<R: Ring> PrepShare<R> for AstraPrepShare<R> {
    const PROTOCOL: &'static str = "astra";

    fn from_rep3(limbs: [R; 2], my_num: usize) -> Self {
        Self([limbs[rep_index(0, my_num)], limbs[rep_index(1, my_num)]])
    }

    fn local_mul_p0(&self, other: &Self) -> R {
        self.sum().wrapping_mul(&other.sum())
    }

    fn local_mul_p1(&self, other: &Self) -> R {
        self.local_mul_p0(other)
    }

    fn local_mul_p2(&self, _other: &Self) -> R {
        R::ZERO
    }
}

impl<R: Ring> Limbs<R> for TrioShare<R> {
    fn from_limbs(limbs: [R; 2]) -> Self {
        Self { limbs }
    }

    fn limbs(&self) -> [R; 2] {
        self.limbs
    }
}

impl<R: Ring> MaskedShare<R> for TrioShare<R> {
    const PROTOCOL: &'static str = "trio";

    fn common_m(&self) -> R {
        self.limbs[0].wrapping_sub(&self.limbs[1])
    }

    fn set_common_m(&mut self, v: R) {
        self.limbs[0] = v.wrapping_add(&self.limbs[1]);
    }

    fn from_masked_input(masked: R, gamma: R) -> Self {
        Self {
            limbs: [masked.wrapping_add(&gamma), gamma],
        }
    }

    fn from_input0(v: R) -> Self {
        Self { limbs: [v, v] }
    }

    fn open_summand(&self, my_num: usize) -> R {
        self.limbs[my_num - 1]
    }

    fn local_mul_p1(&self, other: &Self) -> R {
        self.m()
            .wrapping_mul(&other.lambda())
            .wrapping_add(&other.m().wrapping_mul(&self.lambda()))
    }

    fn local_mul_p2(&self, other: &Self) -> R {
        self.m().wrapping_mul(&other.m())
    }
}

impl<R: Ring> Limbs<R> for TrioPrepShare<R> {
    fn from_limbs(limbs: [R; 2]) -> Self {
        Self(limbs)
    }

    fn limbs(&self) -> [R; 2] {
        self.0
    }
}

impl<R: Ring> PrepShare<R> for TrioPrepShare<R> {
    const PROTOCOL: &'static str = "trio";

    fn from_rep3(limbs: [R; 2], my_num: usize) -> Self {
        let mut res = [limbs[rep_index(0, my_num)], limbs[rep_index(1, my_num)]];
        if my_num > 0 {
            res[0] = res[0].wrapping_add(&res[1]);
        }
        Self(res)
    }

    fn local_mul_p0(&self, other: &Self) -> R {
        let [x0, x1] = self.0;
        let [y0, y1] = other.0;
        x1.wrapping_mul(&y1)
            .wrapping_sub(&x0.wrapping_sub(&x1).wrapping_mul(&y0.wrapping_sub(&y1)))
    }

    fn local_mul_p1(&self, _other: &Self) -> R {
        R::ZERO
    }

    fn local_mul_p2(&self, _other: &Self) -> R {
        R::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Masked value produced by summing the online parties' multiplication
    /// contributions plus the helper's correlation must equal
    /// `x·y + λ_z` for any sharings and product mask.
    #[test]
    fn astra_local_mul_reconstructs_product() {
        let cases: &[(u64, u64, u64, u64, u64, u64)] = &[
            (3, 5, 0xdead, 0xbeef, 0x1234, 0x5678),
            (u64::MAX, 7, 1, 2, 3, 4),
            (1 << 63, 1 << 63, 99, 98, 97, 96),
        ];
        for &(x, y, nlx1, nlx2, nly1, nly2) in cases {
            let m_x = x.wrapping_sub(nlx1).wrapping_sub(nlx2);
            let m_y = y.wrapping_sub(nly1).wrapping_sub(nly2);
            let x1 = AstraShare { m: m_x, neg_lambda: nlx1 };
            let x2 = AstraShare { m: m_x, neg_lambda: nlx2 };
            let y1 = AstraShare { m: m_y, neg_lambda: nly1 };
            let y2 = AstraShare { m: m_y, neg_lambda: nly2 };
            let px1 = AstraPrepShare([nlx1, nlx2]);
            let py1 = AstraPrepShare([nly1, nly2]);

            let (nlz1, nlz2) = (0x42u64, 0x43u64);
            // party 1 adds gamma, party 2 adds helper's correlation minus gamma
            let gamma = 0x77u64;
            let helper = px1.local_mul_p0(&py1);
            let m1 = x1
                .local_mul_p1(&y1)
                .wrapping_sub(nlz1)
                .wrapping_add(gamma);
            let m2 = x2
                .local_mul_p2(&y2)
                .wrapping_sub(nlz2)
                .wrapping_add(helper.wrapping_sub(gamma));
            let m_z = m1.wrapping_add(m2);
            assert_eq!(
                m_z.wrapping_add(nlz1).wrapping_add(nlz2),
                x.wrapping_mul(y)
            );
        }
    }

    /// Same reconstruction identity for the Trio layout, where the exchanged
    /// values differ by sign and the helper correlation is additive.
    #[test]
    fn trio_local_mul_reconstructs_product() {
        let (x, y): (u64, u64) = (12345, 678910);
        let (nlx1, nlx2, nly1, nly2) = (5u64, 6u64, 7u64, 8u64);
        let m_x = x.wrapping_sub(nlx1).wrapping_sub(nlx2);
        let m_y = y.wrapping_sub(nly1).wrapping_sub(nly2);
        let x1 = TrioShare { limbs: [m_x.wrapping_add(nlx1), nlx1] };
        let x2 = TrioShare { limbs: [m_x.wrapping_add(nlx2), nlx2] };
        let y1 = TrioShare { limbs: [m_y.wrapping_add(nly1), nly1] };
        let y2 = TrioShare { limbs: [m_y.wrapping_add(nly2), nly2] };
        // helper holds the plain rep3 limbs before the Trio reordering
        let px = TrioPrepShare([nlx1, nlx2]);
        let py = TrioPrepShare([nly1, nly2]);

        let (nlz1, nlz2, r01) = (0x11u64, 0x22u64, 0x1000u64);
        let v1 = x1.local_mul_p1(&y1).wrapping_add(r01);
        let v2 = x2
            .local_mul_p2(&y2)
            .wrapping_add(px.local_mul_p0(&py).wrapping_add(r01));
        // party 1 learns v2 - nlz2, party 2 learns v1 + nlz1
        let m1 = v2.wrapping_sub(nlz2).wrapping_sub(v1);
        let m2 = v2.wrapping_sub(v1.wrapping_add(nlz1));
        // limb-0 convention: m(i) = common + neg_lambda(i)
        assert_eq!(m1.wrapping_sub(nlz1), m2.wrapping_sub(nlz2));
        let common = m1.wrapping_sub(nlz1);
        assert_eq!(
            common.wrapping_add(nlz1).wrapping_add(nlz2),
            x.wrapping_mul(y)
        );
    }

    #[test]
    fn open_summands_reconstruct() {
        let x: u64 = 0xfeed_beef;
        let (nl1, nl2) = (111u64, 222u64);
        let m = x.wrapping_sub(nl1).wrapping_sub(nl2);
        let a1 = AstraShare { m, neg_lambda: nl1 };
        let a2 = AstraShare { m, neg_lambda: nl2 };
        assert_eq!(a1.open_summand(1).wrapping_add(a2.open_summand(2)), x);

        let t1 = TrioShare { limbs: [m.wrapping_add(nl1), nl1] };
        let t2 = TrioShare { limbs: [m.wrapping_add(nl2), nl2] };
        assert_eq!(t1.open_summand(1).wrapping_add(t2.open_summand(2)), x);
        assert_eq!(t1.common_m(), m);
    }

    #[test]
    fn linearity() {
        let a = AstraShare { m: 10u64, neg_lambda: 3 };
        let b = AstraShare { m: 20u64, neg_lambda: 5 };
        assert_eq!(a.wrapping_add(&b), AstraShare { m: 30, neg_lambda: 8 });
        assert_eq!(b.wrapping_sub(&a), AstraShare { m: 10, neg_lambda: 2 });
        assert_eq!(a.mul_clear(3), AstraShare { m: 30, neg_lambda: 9 });
        assert_eq!(a.shl(1), AstraShare { m: 20, neg_lambda: 6 });
        assert_eq!(AstraShare::<u64>::constant(7).m, 7);
    }

    #[test]
    fn trio_from_rep3_folds_limbs() {
        let limbs = [3u64, 4u64];
        assert_eq!(TrioPrepShare::from_rep3(limbs, 0).0, [3, 4]);
        // party 1: m-limb comes from slot 0, lambda from slot 1, then folded
        assert_eq!(TrioPrepShare::from_rep3(limbs, 1).0, [7, 4]);
        // party 2: limbs swap before folding
        assert_eq!(TrioPrepShare::from_rep3(limbs, 2).0, [7, 3]);
    }
}
