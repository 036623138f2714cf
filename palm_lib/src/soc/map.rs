//! Bus memory map
//!
//! The DragonBall register window isn't listed here, where it decodes depends on SCR.DMAP (see
//! `system_control::register_offset`).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range(pub u32, u32);

impl Range {
    /// Return `Some(offset)` if addr is contained in `self`
    pub fn contains(self, addr: u32) -> Option<u32> {
        let Range(start, length) = self;

        if addr >= start && addr - start < length {
            Some(addr - start)
        } else {
            None
        }
    }
}

/// Base of the DragonBall register window
pub const REGISTER_WINDOW_BASE: u32 = 0xffff_f000;

/// Synchronous serial port registers
pub const SSP: Range = Range(0x4100_0000, 0x20);

#[test]
fn range_contains() {
    assert_eq!(SSP.contains(0x4100_0000), Some(0));
    assert_eq!(SSP.contains(0x4100_0010), Some(0x10));
    assert_eq!(SSP.contains(0x4100_0020), None);
    assert_eq!(SSP.contains(0x40ff_fffc), None);

    // No overflow at the top of the address space
    assert_eq!(Range(0xffff_fff0, 0x10).contains(0xffff_ffff), Some(0xf));
}
