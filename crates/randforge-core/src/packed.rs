//! Fixed-layout (packed) structures.
//!
//! A packed structure concatenates its fields MSB-first in declaration
//! order: the first field occupies the most significant bits. Packed
//! widths are limited to 128 bits.

use crate::native::Native;
use crate::var::Var;

/// Maximum packed width.
pub const MAX_PACKED_WIDTH: u32 = 128;

fn mask128(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// A value with a fixed bit layout.
pub trait Packed {
    fn packed_width(&self) -> u32;

    fn pack(&self) -> u128;

    fn unpack(&mut self, raw: u128);
}

impl<T: Native> Packed for Var<T> {
    fn packed_width(&self) -> u32 {
        self.width()
    }

    fn pack(&self) -> u128 {
        self.to_bits() as u128
    }

    fn unpack(&mut self, raw: u128) {
        self.from_bits(raw as u64);
    }
}

impl<P: Packed, const N: usize> Packed for [P; N] {
    fn packed_width(&self) -> u32 {
        self.iter().map(Packed::packed_width).sum()
    }

    fn pack(&self) -> u128 {
        let fields: Vec<&dyn Packed> = self.iter().map(|p| p as &dyn Packed).collect();
        pack_fields(&fields)
    }

    fn unpack(&mut self, raw: u128) {
        let mut fields: Vec<&mut dyn Packed> =
            self.iter_mut().map(|p| p as &mut dyn Packed).collect();
        unpack_fields(&mut fields, raw);
    }
}

/// Concatenates `fields`, first field most significant.
///
/// # Panics
///
/// Panics if the total width exceeds [`MAX_PACKED_WIDTH`].
pub fn pack_fields(fields: &[&dyn Packed]) -> u128 {
    let total: u32 = fields.iter().map(|f| f.packed_width()).sum();
    assert!(
        total <= MAX_PACKED_WIDTH,
        "packed width {total} exceeds {MAX_PACKED_WIDTH} bits"
    );
    fields.iter().fold(0u128, |raw, field| {
        let width = field.packed_width();
        let shifted = raw.checked_shl(width).unwrap_or(0);
        shifted | (field.pack() & mask128(width))
    })
}

/// Splits `raw` over `fields`, first field most significant.
///
/// # Panics
///
/// Panics if the total width exceeds [`MAX_PACKED_WIDTH`].
pub fn unpack_fields(fields: &mut [&mut dyn Packed], raw: u128) {
    let total: u32 = fields.iter().map(|f| f.packed_width()).sum();
    assert!(
        total <= MAX_PACKED_WIDTH,
        "packed width {total} exceeds {MAX_PACKED_WIDTH} bits"
    );
    let mut shift = total;
    for field in fields.iter_mut() {
        let width = field.packed_width();
        shift -= width;
        let bits = raw.checked_shr(shift).unwrap_or(0) & mask128(width);
        field.unpack(bits);
    }
}

/// Bit-level accessors for packed structures, as generated by
/// `#[derive(Struct)]`.
pub trait Struct: Packed {
    fn width(&self) -> u32 {
        self.packed_width()
    }

    fn to_bits(&self) -> u128 {
        self.pack()
    }

    fn from_bits(&mut self, raw: u128) {
        self.unpack(raw & mask128(self.packed_width()));
    }

    /// Packed value.
    fn value(&self) -> u128 {
        self.pack()
    }

    fn set_value(&mut self, raw: u128) {
        self.from_bits(raw);
    }

    /// Bit `index` (0 is the least significant bit).
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the packed width.
    fn bit(&self, index: u32) -> bool {
        assert!(index < self.packed_width(), "bit {index} out of range");
        (self.pack() >> index) & 1 == 1
    }

    fn set_bit(&mut self, index: u32, value: bool) {
        assert!(index < self.packed_width(), "bit {index} out of range");
        let raw = self.pack() & !(1u128 << index);
        self.unpack(raw | ((value as u128) << index));
    }

    /// Bits `lo..hi` (upper bound exclusive), shifted down to bit 0.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty or outside the packed width.
    fn slice(&self, lo: u32, hi: u32) -> u128 {
        assert!(
            lo < hi && hi <= self.packed_width(),
            "slice [{lo}:{hi}] out of range"
        );
        (self.pack() >> lo) & mask128(hi - lo)
    }

    fn set_slice(&mut self, lo: u32, hi: u32, value: u128) {
        assert!(
            lo < hi && hi <= self.packed_width(),
            "slice [{lo}:{hi}] out of range"
        );
        let field = mask128(hi - lo) << lo;
        let raw = (self.pack() & !field) | ((value << lo) & field);
        self.unpack(raw);
    }
}
