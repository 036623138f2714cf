//! Backing store for the 4KiB DragonBall register window
//!
//! Every register that isn't fully virtualized by a peripheral lives here. Peripherals with
//! derived state (chip selects, PLL, interrupt controller) write their sanitized value back into
//! the window so that guest reads always see the latest snapshot.

use super::addressable::Addressable;

/// Size of the register window
pub const REGISTER_WINDOW_SIZE: usize = 0x1000;

/// Mask applied to every offset before it touches the buffer
const OFFSET_MASK: u32 = (REGISTER_WINDOW_SIZE as u32) - 1;

/// System Control Register
pub const SCR: u32 = 0x000;

/// Chip select group base addresses
pub const CSGBA: u32 = 0x100;
pub const CSGBB: u32 = 0x102;
pub const CSGBC: u32 = 0x104;
pub const CSGBD: u32 = 0x106;
/// Chip select upper group base address
pub const CSUGBA: u32 = 0x108;
/// Chip select control register 1
pub const CSCTRL1: u32 = 0x10a;
pub const CSA: u32 = 0x110;
pub const CSB: u32 = 0x112;
pub const CSC: u32 = 0x114;
pub const CSD: u32 = 0x116;
/// CSCTRL2 and 3 only deal with bus timings and transfer sizes, they're plain storage
pub const CSCTRL2: u32 = 0x150;
pub const CSCTRL3: u32 = 0x152;

/// PLL control register
pub const PLLCR: u32 = 0x200;
/// PLL frequency select register
pub const PLLFSR: u32 = 0x202;

/// Interrupt mask register
pub const IMR: u32 = 0x304;
/// Interrupt status register
pub const ISR: u32 = 0x30c;
/// Interrupt pending register
pub const IPR: u32 = 0x310;
/// Interrupt level control register
pub const ILCR: u32 = 0x314;

pub struct RegisterBus {
    data: [u8; REGISTER_WINDOW_SIZE],
}

impl RegisterBus {
    pub fn new() -> RegisterBus {
        RegisterBus {
            data: [0; REGISTER_WINDOW_SIZE],
        }
    }

    /// Zero the whole window
    pub fn clear(&mut self) {
        self.data = [0; REGISTER_WINDOW_SIZE];
    }

    /// Fetch the big endian value at `offset`. Each byte index is masked individually so a wide
    /// access at the very end of the window wraps around instead of running past the buffer.
    pub fn read<T: Addressable>(&self, offset: u32) -> T {
        let mut v = 0u32;

        for i in 0..T::width() as u32 {
            let b = self.data[(offset.wrapping_add(i) & OFFSET_MASK) as usize];

            v = (v << 8) | u32::from(b);
        }

        T::from_u32(v)
    }

    /// Store `val` big endian at `offset`
    pub fn write<T: Addressable>(&mut self, offset: u32, val: T) {
        let width = T::width() as u32;
        let val = val.as_u32();

        for i in 0..width {
            let shift = (width - 1 - i) * 8;

            self.data[(offset.wrapping_add(i) & OFFSET_MASK) as usize] = (val >> shift) as u8;
        }
    }

    pub fn read8(&self, offset: u32) -> u8 {
        self.read(offset)
    }

    pub fn read16(&self, offset: u32) -> u16 {
        self.read(offset)
    }

    pub fn read32(&self, offset: u32) -> u32 {
        self.read(offset)
    }

    pub fn write8(&mut self, offset: u32, val: u8) {
        self.write(offset, val)
    }

    pub fn write16(&mut self, offset: u32, val: u16) {
        self.write(offset, val)
    }

    pub fn write32(&mut self, offset: u32, val: u32) {
        self.write(offset, val)
    }
}

impl Default for RegisterBus {
    fn default() -> RegisterBus {
        RegisterBus::new()
    }
}

#[test]
fn register_bus_big_endian() {
    let mut regs = RegisterBus::new();

    regs.write32(0x304, 0x00ff_1234);

    assert_eq!(regs.read8(0x305), 0xff);
    assert_eq!(regs.read16(0x306), 0x1234);
    assert_eq!(regs.read32(0x304), 0x00ff_1234);
}

#[test]
fn register_bus_offsets_are_masked() {
    let mut regs = RegisterBus::new();

    // Full bus addresses land in the window
    regs.write16(0xffff_f202, 0x0347);
    assert_eq!(regs.read16(PLLFSR), 0x0347);

    // Wide accesses at the end of the window wrap around
    regs.write32(0xffe, 0xdead_beef);
    assert_eq!(regs.read16(0xffe), 0xdead);
    assert_eq!(regs.read16(0x000), 0xbeef);
}
