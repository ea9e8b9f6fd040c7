//! Bit-level access over caller-owned `u32` storage.
//!
//! Bits are numbered from the LSB of slot 0 upwards. Multi-bit reads and
//! writes (`read_uint_n`, `write_f32`, ...) may straddle two slots.
//!
//! ```
//! use qlibs_core::bitfield::{slots_for, BitField};
//! let mut area = [0u32; slots_for(48)];
//! let mut bf = BitField::new(&mut area);
//! bf.write_uint_n(28, 8, 0xA5).unwrap();
//! assert_eq!(bf.read_uint_n(28, 8).unwrap(), 0xA5);
//! ```

#![allow(clippy::cast_possible_truncation)]

use crate::error::BitFieldError;

const LBIT: usize = 32;

/// Number of `u32` slots needed to hold `nbits` bits.
#[inline]
pub const fn slots_for(nbits: usize) -> usize {
    nbits.div_ceil(LBIT)
}

#[derive(Debug)]
pub struct BitField<'a> {
    field: &'a mut [u32],
}

impl<'a> BitField<'a> {
    #[inline]
    pub fn new(area: &'a mut [u32]) -> Self {
        Self { field: area }
    }

    /// Capacity in bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.field.len() * LBIT
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    #[inline]
    pub fn clear_all(&mut self) {
        self.field.fill(0);
    }

    #[inline]
    pub fn set_all(&mut self) {
        self.field.fill(u32::MAX);
    }

    pub fn set_bit(&mut self, index: usize) -> Result<(), BitFieldError> {
        self.check(index, 1)?;
        self.field[index / LBIT] |= bit_mask(index);
        Ok(())
    }

    pub fn clear_bit(&mut self, index: usize) -> Result<(), BitFieldError> {
        self.check(index, 1)?;
        self.field[index / LBIT] &= !bit_mask(index);
        Ok(())
    }

    pub fn toggle_bit(&mut self, index: usize) -> Result<(), BitFieldError> {
        self.check(index, 1)?;
        self.field[index / LBIT] ^= bit_mask(index);
        Ok(())
    }

    pub fn read_bit(&self, index: usize) -> Result<bool, BitFieldError> {
        self.check(index, 1)?;
        Ok(self.field[index / LBIT] & bit_mask(index) != 0)
    }

    pub fn write_bit(&mut self, index: usize, value: bool) -> Result<(), BitFieldError> {
        if value {
            self.set_bit(index)
        } else {
            self.clear_bit(index)
        }
    }

    /// Read `n` bits (1..=32) starting at `index`, right-aligned.
    pub fn read_uint_n(&self, index: usize, n: usize) -> Result<u32, BitFieldError> {
        self.check_width(n)?;
        self.check(index, n)?;
        Ok(self.read_u32(index) & low_mask(n))
    }

    /// Write the low `n` bits (1..=32) of `value` starting at `index`.
    pub fn write_uint_n(&mut self, index: usize, n: usize, value: u32) -> Result<(), BitFieldError> {
        self.check_width(n)?;
        self.check(index, n)?;
        if n == LBIT {
            self.write_u32(index, value);
        } else {
            let w = self.read_u32(index);
            let value = value & low_mask(n);
            let keep = u32::MAX << n;
            self.write_u32(index, value ^ ((w ^ value) & keep));
        }
        Ok(())
    }

    pub fn read_f32(&self, index: usize) -> Result<f32, BitFieldError> {
        self.read_uint_n(index, LBIT).map(f32::from_bits)
    }

    pub fn write_f32(&mut self, index: usize, value: f32) -> Result<(), BitFieldError> {
        self.write_uint_n(index, LBIT, value.to_bits())
    }

    /// Copy the raw storage, little-endian, into `dst`. Returns the byte count.
    pub fn dump(&self, dst: &mut [u8]) -> Result<usize, BitFieldError> {
        let bytes = self.field.len() * 4;
        if dst.len() > bytes {
            return Err(BitFieldError::IndexOutOfRange { index: dst.len() * 8, len: self.len() });
        }
        for (i, b) in dst.iter_mut().enumerate() {
            *b = (self.field[i / 4] >> (8 * (i % 4))) as u8;
        }
        Ok(dst.len())
    }

    #[inline]
    fn check(&self, index: usize, n: usize) -> Result<(), BitFieldError> {
        match index.checked_add(n) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(BitFieldError::IndexOutOfRange { index, len: self.len() }),
        }
    }

    #[inline]
    fn check_width(&self, n: usize) -> Result<(), BitFieldError> {
        if (1..=LBIT).contains(&n) {
            Ok(())
        } else {
            Err(BitFieldError::InvalidWidth(n))
        }
    }

    // 32 bits starting at `index`; bits past the end read as zero.
    fn read_u32(&self, index: usize) -> u32 {
        let s = index / LBIT;
        let of = index % LBIT;
        let mut r = self.field[s] >> of;
        if of != 0 && s + 1 < self.field.len() {
            r |= self.field[s + 1] << (LBIT - of);
        }
        r
    }

    fn write_u32(&mut self, index: usize, value: u32) {
        let s = index / LBIT;
        let of = index % LBIT;
        if of == 0 {
            self.field[s] = value;
            return;
        }
        let low = low_mask(of);
        self.field[s] = (value << of) | (self.field[s] & low);
        if s + 1 < self.field.len() {
            self.field[s + 1] = (value >> (LBIT - of)) | (self.field[s + 1] & !low);
        }
    }
}

#[inline]
fn bit_mask(index: usize) -> u32 {
    1 << (index % LBIT)
}

#[inline]
fn low_mask(n: usize) -> u32 {
    u32::MAX >> (LBIT - n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bits() {
        let mut area = [0u32; 2];
        let mut bf = BitField::new(&mut area);
        bf.set_bit(0).unwrap();
        bf.set_bit(33).unwrap();
        bf.toggle_bit(33).unwrap();
        bf.write_bit(63, true).unwrap();
        assert!(bf.read_bit(0).unwrap());
        assert!(!bf.read_bit(33).unwrap());
        assert!(bf.read_bit(63).unwrap());
        assert_eq!(bf.read_bit(64), Err(BitFieldError::IndexOutOfRange { index: 64, len: 64 }));
        assert_eq!(area, [1, 0x8000_0000]);
    }

    #[test]
    fn fields_spanning_slots() {
        let mut area = [0u32; 3];
        let mut bf = BitField::new(&mut area);
        bf.set_all();
        bf.write_uint_n(28, 8, 0x5A).unwrap();
        assert_eq!(bf.read_uint_n(28, 8).unwrap(), 0x5A);
        // neighbours untouched
        assert_eq!(bf.read_uint_n(20, 8).unwrap(), 0xFF);
        assert_eq!(bf.read_uint_n(36, 8).unwrap(), 0xFF);
        bf.write_f32(45, -3.25).unwrap();
        assert_eq!(bf.read_f32(45).unwrap(), -3.25);
        assert_eq!(bf.read_uint_n(0, 33), Err(BitFieldError::InvalidWidth(33)));
        assert!(bf.write_uint_n(90, 8, 1).is_err());
    }

    #[test]
    fn dump_is_little_endian() {
        let mut area = [0x0403_0201u32, 0];
        let bf = BitField::new(&mut area);
        let mut out = [0u8; 5];
        assert_eq!(bf.dump(&mut out), Ok(5));
        assert_eq!(out, [1, 2, 3, 4, 0]);
        let mut big = [0u8; 9];
        assert!(bf.dump(&mut big).is_err());
        assert_eq!(slots_for(33), 2);
        assert_eq!(slots_for(32), 1);
    }
}
