/// The DragonBall bus supports these access sizes
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AccessWidth {
    Byte = 1,
    HalfWord = 2,
    Word = 4,
}

/// Trait representing the values that can be moved over the register bus
pub trait Addressable: Copy {
    fn width() -> AccessWidth;

    /// Build a value from a u32, truncating if necessary
    fn from_u32(v: u32) -> Self;

    fn as_u32(self) -> u32;

    fn as_u16(self) -> u16 {
        self.as_u32() as u16
    }

    fn as_u8(self) -> u8 {
        self.as_u32() as u8
    }
}

impl Addressable for u8 {
    fn width() -> AccessWidth {
        AccessWidth::Byte
    }

    fn from_u32(v: u32) -> u8 {
        v as u8
    }

    fn as_u32(self) -> u32 {
        u32::from(self)
    }
}

impl Addressable for u16 {
    fn width() -> AccessWidth {
        AccessWidth::HalfWord
    }

    fn from_u32(v: u32) -> u16 {
        v as u16
    }

    fn as_u32(self) -> u32 {
        u32::from(self)
    }
}

impl Addressable for u32 {
    fn width() -> AccessWidth {
        AccessWidth::Word
    }

    fn from_u32(v: u32) -> u32 {
        v
    }

    fn as_u32(self) -> u32 {
        self
    }
}
