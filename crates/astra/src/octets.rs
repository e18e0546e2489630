//! Byte buffer for network communication and file storage.
//!
//! When sent over the network or stored in a file, the length is prefixed as
//! eight bytes in little-endian order. Sequential reading happens through a
//! separate read head; packed booleans use one-byte groups carrying up to
//! seven bits of payload.
use crate::errors::Error;
use crate::ring::Ring;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

const BITS_PER_GROUP: u8 = 7;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Octets {
    data: Vec<u8>,
    #[serde(skip)]
    read_head: usize,
    #[serde(skip)]
    write_bits: BitHead,
    #[serde(skip)]
    read_bits: BitHead,
}

#[derive(Clone, Copy, Debug, Default)]
struct BitHead {
    /// bits consumed or produced in the current group byte
    n: u8,
    /// position of the current group byte
    pos: usize,
}

impl Octets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    pub fn left(&self) -> usize {
        self.data.len() - self.read_head
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn reserve<R: Ring>(&mut self, n_items: usize) {
        self.data.reserve(n_items * R::BYTES);
    }

    /// Discard contents and reset both heads.
    pub fn reset_write_head(&mut self) {
        self.data.clear();
        self.read_head = 0;
        self.write_bits = BitHead::default();
        self.read_bits = BitHead::default();
    }

    pub fn reset_read_head(&mut self) {
        self.read_head = 0;
        self.read_bits = BitHead::default();
    }

    /// Framing check: at least `n_items` limbs must be left to read.
    pub fn require<R: Ring>(&self, n_items: usize) -> Result<(), Error> {
        let needed = n_items * R::BYTES;
        if self.left() < needed {
            return Err(Error::InsufficientData {
                needed,
                left: self.left(),
            });
        }
        Ok(())
    }

    pub fn store<R: Ring>(&mut self, value: R) {
        value.write_le(&mut self.data);
    }

    pub fn get<R: Ring>(&mut self) -> Result<R, Error> {
        self.require::<R>(1)?;
        let value = R::from_le(&self.data[self.read_head..]);
        self.read_head += R::BYTES;
        Ok(value)
    }

    /// Append a packed bit. Groups of up to seven bits share one byte.
    pub fn store_bit(&mut self, bit: bool) {
        if self.write_bits.n == 0 {
            self.write_bits.pos = self.data.len();
            self.data.push(0);
        }
        if bit {
            self.data[self.write_bits.pos] |= 1 << self.write_bits.n;
        }
        self.write_bits.n = (self.write_bits.n + 1) % BITS_PER_GROUP;
    }

    pub fn get_bit(&mut self) -> Result<bool, Error> {
        if self.read_bits.n == 0 {
            if self.left() == 0 {
                return Err(Error::InsufficientData {
                    needed: 1,
                    left: 0,
                });
            }
            self.read_bits.pos = self.read_head;
            self.read_head += 1;
        }
        let bit = self.data[self.read_bits.pos] >> self.read_bits.n & 1 == 1;
        self.read_bits.n = (self.read_bits.n + 1) % BITS_PER_GROUP;
        Ok(bit)
    }

    /// Close the current bit group; the next `store_bit` starts a fresh byte.
    pub fn flush_bits(&mut self) {
        self.write_bits = BitHead::default();
    }

    /// Write with an eight-byte little-endian length prefix.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&(self.data.len() as u64).to_le_bytes())?;
        writer.write_all(&self.data)
    }

    /// Read one length-prefixed buffer.
    pub fn read_from<Rd: Read>(reader: &mut Rd) -> io::Result<Self> {
        let mut len = [0u8; 8];
        reader.read_exact(&mut len)?;
        let len = u64::from_le_bytes(len) as usize;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        Ok(Self::from_vec(data))
    }
}
