//! The computation domain ℤ/2ᵏ.
//!
//! Widths up to 128 bits ride on native integers; the wider domains of the
//! supported set are two's-complement integers over little-endian 64-bit
//! limbs ([`Z2k`]).
use num_traits::{WrappingAdd, WrappingMul, WrappingSub};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
use std::mem;
use std::ops::{Add, BitAnd, BitXor, Mul, Not, Shl, Shr, Sub};

/// Elements of ℤ/2ᵏ in two's complement, backed by a native integer.
///
/// This doesn't capture a ring in the mathematical sense, but is enough for
/// our purposes. All shifts take the shift amount in bits; `wrapping_shr` is
/// the logical (zero-extending) shift, `signed_shr` sign-extends.
pub trait Ring:
    WrappingAdd
    + WrappingSub
    + WrappingMul
    + BitAnd<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + Copy
    + Clone
    + Debug
    + Default
    + PartialEq
    + Eq
    + PartialOrd
    + Ord
    + Hash
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + 'static
{
    const BITS: usize;
    const BYTES: usize;
    const MAX: Self;
    const ZERO: Self;
    const ONE: Self;

    fn wrapping_neg(&self) -> Self;
    fn wrapping_shl(&self, n: usize) -> Self;
    /// Logical right shift.
    fn wrapping_shr(&self, n: usize) -> Self;
    /// Arithmetic right shift.
    fn signed_shr(&self, n: usize) -> Self;

    fn write_le(&self, buf: &mut Vec<u8>);
    /// Deserialize from exactly [`Self::BYTES`] little-endian bytes.
    fn from_le(bytes: &[u8]) -> Self;

    /// Most significant bit of the full domain, as 0 or 1.
    fn msb(&self) -> Self {
        self.wrapping_shr(Self::BITS - 1)
    }

    /// Bit `idx`, as 0 or 1.
    fn get_bit(&self, idx: usize) -> Self {
        self.wrapping_shr(idx) & Self::ONE
    }

    fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

macro_rules! impl_ring {
    ($($typ:ty),+) => {
        $(
        impl Ring for $typ {
            const BITS: usize = { Self::BYTES * 8 };
            const BYTES: usize = { mem::size_of::<Self>() };
            const MAX: Self = <$typ>::MAX;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn wrapping_neg(&self) -> Self {
                <$typ>::wrapping_neg(*self)
            }

            fn wrapping_shl(&self, n: usize) -> Self {
                if n >= <Self as Ring>::BITS {
                    0
                } else {
                    *self << n
                }
            }

            fn wrapping_shr(&self, n: usize) -> Self {
                if n >= <Self as Ring>::BITS {
                    0
                } else {
                    *self >> n
                }
            }

            fn signed_shr(&self, n: usize) -> Self {
                let signed = *self as <$typ as Signed>::S;
                if n >= <Self as Ring>::BITS {
                    (signed >> (<Self as Ring>::BITS - 1)) as $typ
                } else {
                    (signed >> n) as $typ
                }
            }

            fn write_le(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }

            fn from_le(bytes: &[u8]) -> Self {
                let arr: [u8; Self::BYTES] = bytes[..Self::BYTES]
                    .try_into()
                    .expect("caller must provide BYTES bytes");
                Self::from_le_bytes(arr)
            }
        }
        )*
    };
}

/// Maps an unsigned limb type to its signed counterpart for arithmetic shifts.
trait Signed {
    type S;
}

macro_rules! impl_signed {
    ($($u:ty => $s:ty),+) => {
        $(impl Signed for $u { type S = $s; })*
    };
}

impl_signed!(u8 => i8, u16 => i16, u32 => i32, u64 => i64, u128 => i128);
impl_ring!(u8, u16, u32, u64, u128);

/// ℤ/2ᵏ for k beyond the native widths, as `N` little-endian 64-bit limbs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Z2k<const N: usize>([u64; N]);

impl<const N: usize> Serialize for Z2k<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(N)?;
        for limb in &self.0 {
            tup.serialize_element(limb)?;
        }
        tup.end()
    }
}

impl<'de, const N: usize> Deserialize<'de> for Z2k<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Z2kVisitor<const N: usize>;

        impl<'de, const N: usize> serde::de::Visitor<'de> for Z2kVisitor<N> {
            type Value = Z2k<N>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a tuple of {} u64 limbs", N)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut limbs = [0u64; N];
                for (i, limb) in limbs.iter_mut().enumerate() {
                    *limb = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                Ok(Z2k(limbs))
            }
        }

        deserializer.deserialize_tuple(N, Z2kVisitor::<N>)
    }
}

impl<const N: usize> Z2k<N> {
    pub const fn zero() -> Self {
        Self([0; N])
    }

    pub const fn one() -> Self {
        Self::from_u64(1)
    }

    pub const fn max_value() -> Self {
        Self([u64::MAX; N])
    }

    pub const fn from_u64(v: u64) -> Self {
        let mut limbs = [0; N];
        limbs[0] = v;
        Self(limbs)
    }

    pub const fn from_limbs(limbs: [u64; N]) -> Self {
        Self(limbs)
    }

    pub fn limbs(&self) -> [u64; N] {
        self.0
    }

    fn add_wrapping(&self, other: &Self) -> Self {
        let mut res = [0u64; N];
        let mut carry = 0u64;
        for i in 0..N {
            let (s1, c1) = self.0[i].overflowing_add(other.0[i]);
            let (s2, c2) = s1.overflowing_add(carry);
            res[i] = s2;
            carry = (c1 | c2) as u64;
        }
        Self(res)
    }

    fn sub_wrapping(&self, other: &Self) -> Self {
        let mut res = [0u64; N];
        let mut borrow = 0u64;
        for i in 0..N {
            let (d1, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (d2, b2) = d1.overflowing_sub(borrow);
            res[i] = d2;
            borrow = (b1 | b2) as u64;
        }
        Self(res)
    }

    /// Schoolbook product, keeping only the low `N` limbs.
    fn mul_wrapping(&self, other: &Self) -> Self {
        let mut res = [0u64; N];
        for i in 0..N {
            let mut carry = 0u64;
            for j in 0..N - i {
                let t = u128::from(self.0[i]) * u128::from(other.0[j])
                    + u128::from(res[i + j])
                    + u128::from(carry);
                res[i + j] = t as u64;
                carry = (t >> 64) as u64;
            }
        }
        Self(res)
    }

    fn neg_wrapping(&self) -> Self {
        let mut res = [0u64; N];
        for i in 0..N {
            res[i] = !self.0[i];
        }
        Self(res).add_wrapping(&Self::one())
    }

    fn shl_bits(&self, n: usize) -> Self {
        if n >= N * 64 {
            return Self::zero();
        }
        let (limb_shift, bit_shift) = (n / 64, n % 64);
        let mut res = [0u64; N];
        for i in limb_shift..N {
            let mut v = self.0[i - limb_shift] << bit_shift;
            if bit_shift > 0 && i > limb_shift {
                v |= self.0[i - limb_shift - 1] >> (64 - bit_shift);
            }
            res[i] = v;
        }
        Self(res)
    }

    fn shr_bits(&self, n: usize) -> Self {
        if n >= N * 64 {
            return Self::zero();
        }
        let (limb_shift, bit_shift) = (n / 64, n % 64);
        let mut res = [0u64; N];
        for i in 0..N - limb_shift {
            let mut v = self.0[i + limb_shift] >> bit_shift;
            if bit_shift > 0 && i + limb_shift + 1 < N {
                v |= self.0[i + limb_shift + 1] << (64 - bit_shift);
            }
            res[i] = v;
        }
        Self(res)
    }

    fn sar_bits(&self, n: usize) -> Self {
        let negative = self.0[N - 1] >> 63 == 1;
        if n >= N * 64 {
            return if negative {
                Self::max_value()
            } else {
                Self::zero()
            };
        }
        let mut res = self.shr_bits(n);
        if negative {
            let mask = Self::max_value().shl_bits(N * 64 - n);
            for i in 0..N {
                res.0[i] |= mask.0[i];
            }
        }
        res
    }

    fn put_le(&self, buf: &mut Vec<u8>) {
        for limb in self.0 {
            buf.extend_from_slice(&limb.to_le_bytes());
        }
    }

    fn take_le(bytes: &[u8]) -> Self {
        let mut limbs = [0u64; N];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let arr: [u8; 8] = bytes[i * 8..(i + 1) * 8]
                .try_into()
                .expect("caller must provide BYTES bytes");
            *limb = u64::from_le_bytes(arr);
        }
        Self(limbs)
    }
}

impl<const N: usize> Default for Z2k<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> Ord for Z2k<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..N).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl<const N: usize> PartialOrd for Z2k<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const N: usize> Add for Z2k<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.add_wrapping(&rhs)
    }
}

impl<const N: usize> Sub for Z2k<N> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.sub_wrapping(&rhs)
    }
}

impl<const N: usize> Mul for Z2k<N> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.mul_wrapping(&rhs)
    }
}

impl<const N: usize> WrappingAdd for Z2k<N> {
    fn wrapping_add(&self, v: &Self) -> Self {
        self.add_wrapping(v)
    }
}

impl<const N: usize> WrappingSub for Z2k<N> {
    fn wrapping_sub(&self, v: &Self) -> Self {
        self.sub_wrapping(v)
    }
}

impl<const N: usize> WrappingMul for Z2k<N> {
    fn wrapping_mul(&self, v: &Self) -> Self {
        self.mul_wrapping(v)
    }
}

impl<const N: usize> Not for Z2k<N> {
    type Output = Self;

    fn not(mut self) -> Self {
        for limb in &mut self.0 {
            *limb = !*limb;
        }
        self
    }
}

impl<const N: usize> BitAnd for Z2k<N> {
    type Output = Self;

    fn bitand(mut self, rhs: Self) -> Self {
        for i in 0..N {
            self.0[i] &= rhs.0[i];
        }
        self
    }
}

impl<const N: usize> BitXor for Z2k<N> {
    type Output = Self;

    fn bitxor(mut self, rhs: Self) -> Self {
        for i in 0..N {
            self.0[i] ^= rhs.0[i];
        }
        self
    }
}

impl<const N: usize> Shl<usize> for Z2k<N> {
    type Output = Self;

    fn shl(self, n: usize) -> Self {
        self.shl_bits(n)
    }
}

impl<const N: usize> Shr<usize> for Z2k<N> {
    type Output = Self;

    fn shr(self, n: usize) -> Self {
        self.shr_bits(n)
    }
}

impl<const N: usize> Distribution<Z2k<N>> for Standard {
    fn sample<Rg: Rng + ?Sized>(&self, rng: &mut Rg) -> Z2k<N> {
        let mut limbs = [0u64; N];
        for limb in &mut limbs {
            *limb = rng.gen();
        }
        Z2k(limbs)
    }
}

macro_rules! impl_wide_ring {
    ($($alias:ident = $n:literal),+ $(,)?) => {
        $(
        pub type $alias = Z2k<$n>;

        impl Ring for Z2k<$n> {
            const BITS: usize = { $n * 64 };
            const BYTES: usize = { $n * 8 };
            const MAX: Self = Z2k::<$n>::max_value();
            const ZERO: Self = Z2k::<$n>::zero();
            const ONE: Self = Z2k::<$n>::one();

            fn wrapping_neg(&self) -> Self {
                self.neg_wrapping()
            }

            fn wrapping_shl(&self, n: usize) -> Self {
                self.shl_bits(n)
            }

            fn wrapping_shr(&self, n: usize) -> Self {
                self.shr_bits(n)
            }

            fn signed_shr(&self, n: usize) -> Self {
                self.sar_bits(n)
            }

            fn write_le(&self, buf: &mut Vec<u8>) {
                self.put_le(buf);
            }

            fn from_le(bytes: &[u8]) -> Self {
                Self::take_le(bytes)
            }
        }
        )*
    };
}

impl_wide_ring!(Z2k192 = 3, Z2k256 = 4, Z2k384 = 6, Z2k512 = 8);

/// Ring bitwidths this engine supports: native limbs up to 128 bits and the
/// wide multi-limb domains beyond.
pub const SUPPORTED_BITS: &[usize] = &[8, 16, 32, 64, 128, 192, 256, 384, 512];
