/// Simple trait to simplify register bit manipulation
pub trait Bitwise: Copy {
    /// Returns true if the given bit is set in `self`
    fn bit(self, bitpos: u8) -> bool;

    /// Sets the given bit in self to 1 if `v` is true, 0 if `v` is false
    fn set_bit(&mut self, bitpos: u8, v: bool);

    /// Extract the `len`-bit wide field starting at `shift`
    fn field(self, shift: u8, len: u8) -> u32;
}

macro_rules! impl_bitwise {
    ($t:ty) => {
        impl Bitwise for $t {
            fn bit(self, bitpos: u8) -> bool {
                self & (1 << bitpos) != 0
            }

            fn set_bit(&mut self, bitpos: u8, v: bool) {
                *self &= !(1 << bitpos);
                *self |= (v as $t) << bitpos;
            }

            fn field(self, shift: u8, len: u8) -> u32 {
                debug_assert!(len > 0 && len < 32);

                (u32::from(self) >> shift) & ((1u32 << len) - 1)
            }
        }
    };
}

impl_bitwise!(u8);
impl_bitwise!(u16);
impl_bitwise!(u32);

#[test]
fn bitwise() {
    let mut v = 0xaau8;

    assert!(v.bit(7));
    assert!(!v.bit(6));

    v.set_bit(6, true);

    assert!(v.bit(6));
    assert_eq!(v, 0xea);

    v.set_bit(7, false);

    assert!(!v.bit(7));
    assert_eq!(v, 0x6a);
}

#[test]
fn bitwise_field() {
    let v = 0x0b47u16;

    assert_eq!(v.field(0, 8), 0x47);
    assert_eq!(v.field(8, 4), 0xb);
    assert_eq!(0xf000_0000u32.field(29, 3), 7);
}
