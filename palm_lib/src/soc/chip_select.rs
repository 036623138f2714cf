//! Chip select controller
//!
//! Four chip select lines map the ROM, the SED display controller, the USB controller and the
//! RAM into the CPU address space. The placement and attributes of each chip are derived from a
//! handful of registers, some of which (CSCTRL1, CSUGBA) are shared between chips. Whenever one
//! of these shared registers changes we re-run the setters of every dependent chip with its last
//! written value: the chip descriptors must always be a pure function of the current register
//! values.

use bitfield::bitfield;

use super::registers::{
    RegisterBus, CSA, CSB, CSC, CSCTRL1, CSCTRL2, CSCTRL3, CSD, CSGBA, CSGBB, CSGBC, CSGBD,
    CSUGBA,
};
use crate::bitwise::Bitwise;

pub const CSA_RESET: u16 = 0x00b0;

const KIB: u32 = 1024;
const MIB: u32 = 1024 * KIB;

/// CSCTRL1 bits that feed into the chip descriptors
const CSCTRL1_DEPENDENT_BITS: u16 = 0x4055;
const CSCTRL1_WRITE_MASK: u16 = 0x7f55;
/// Enables the extended unprotected size range for the chips that opt in
const CSCTRL1_UPSIZ: u16 = 0x4000;
/// Enables the large DRAM size encoding on CSD
const CSCTRL1_DSIZ3: u16 = 0x0040;

/// Enable bit for the upper group base address bits
const CSUGBA_UGEN: u8 = 15;
const CSUGBA_WRITE_MASK: u16 = 0xf777;

const CSGB_WRITE_MASK: u16 = 0xfffe;

bitfield! {
    #[derive(Clone, Copy)]
    pub struct ChipSelectRegister(u16);
    impl Debug;

    ///  0     Chip enable
    pub bool, en, _: 0;
    ///  1-3   Chip size, in units of the chip's base size
    pub u8, siz, _: 3, 1;
    ///  9     CSD only: DRAM selection, enables the 8MB size encoding along with CSCTRL1.DSIZ3
    pub bool, dram, _: 9;
    ///  11-12 Unprotected memory size
    pub u8, ups, _: 12, 11;
    ///  13    Read-only for protected memory
    pub bool, rop, _: 13;
    ///  14    Supervisor-only protected memory
    pub bool, sop, _: 14;
    ///  15    Read-only
    pub bool, ro, _: 15;
}

/// Physical chip select lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipId {
    /// CSA: boot ROM
    Rom = 0,
    /// CSB: SED1376 display controller
    Sed = 1,
    /// CSC: USB controller
    Usb = 2,
    /// CSD: RAM
    Ram = 3,
}

pub const CHIPS: [ChipId; 4] = [ChipId::Rom, ChipId::Sed, ChipId::Usb, ChipId::Ram];

impl ChipId {
    /// Chip select register for this line
    fn cs_register(self) -> u32 {
        match self {
            ChipId::Rom => CSA,
            ChipId::Sed => CSB,
            ChipId::Usb => CSC,
            ChipId::Ram => CSD,
        }
    }

    /// Group base address register for this line
    fn base_register(self) -> u32 {
        match self {
            ChipId::Rom => CSGBA,
            ChipId::Sed => CSGBB,
            ChipId::Usb => CSGBC,
            ChipId::Ram => CSGBD,
        }
    }

    /// Position of this chip's 3 upper address bits in CSUGBA
    fn upper_base_shift(self) -> u8 {
        match self {
            ChipId::Rom => 12,
            ChipId::Sed => 8,
            ChipId::Usb => 4,
            ChipId::Ram => 0,
        }
    }

    /// CSCTRL1 bit doubling the unprotected size range of this chip. The ROM has no protection
    /// attributes at all.
    fn upsiz_bit(self) -> Option<u16> {
        match self {
            ChipId::Rom => None,
            ChipId::Sed => Some(0x0001),
            ChipId::Usb => Some(0x0004),
            ChipId::Ram => Some(0x0010),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Chip {
    pub enabled: bool,
    pub read_only: bool,
    /// Base address, 16KiB aligned
    pub start: u32,
    pub size: u32,
    pub supervisor_only_protected: bool,
    pub read_only_protected: bool,
    /// Size of the region at the start of the chip that isn't subject to the protection
    /// attributes
    pub unprotected_size: u32,
    /// In boot mode the chip answers for every address regardless of its configuration
    pub in_boot_mode: bool,
}

impl Chip {
    /// Return `Some(offset)` if `addr` falls within the chip's configured range
    pub fn contains(&self, addr: u32) -> Option<u32> {
        let offset = addr.wrapping_sub(self.start);

        if offset < self.size {
            Some(offset)
        } else {
            None
        }
    }

    /// True if `offset` is past the unprotected region
    pub fn is_protected(&self, offset: u32) -> bool {
        offset >= self.unprotected_size
    }
}

/// Result of an address decode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChipMapping {
    pub chip: ChipId,
    pub offset: u32,
}

pub struct ChipSelect {
    chips: [Chip; 4],
}

impl ChipSelect {
    pub fn new() -> ChipSelect {
        ChipSelect {
            chips: [Chip::default(); 4],
        }
    }

    /// Restore the reset register values and derive the chips from them. The ROM comes out of
    /// reset enabled and in boot mode.
    pub fn reset(&mut self, regs: &mut RegisterBus) {
        self.chips = [Chip::default(); 4];

        for reg in [CSGBA, CSGBB, CSGBC, CSGBD, CSUGBA, CSCTRL1, CSB, CSC, CSD, CSCTRL2, CSCTRL3] {
            regs.write16(reg, 0);
        }

        for chip in CHIPS {
            self.set_base(regs, chip, 0);
        }

        self.set_csa(regs, CSA_RESET);
        self.set_csb(regs, 0);
        self.set_csc(regs, 0);
        self.set_csd(regs, 0);

        let rom = &mut self.chips[ChipId::Rom as usize];
        rom.enabled = true;
        rom.in_boot_mode = true;
    }

    pub fn chip(&self, id: ChipId) -> &Chip {
        &self.chips[id as usize]
    }

    pub fn chips(&self) -> &[Chip; 4] {
        &self.chips
    }

    pub fn set_csa(&mut self, regs: &mut RegisterBus, value: u16) {
        let reg = ChipSelectRegister(value);
        let rom = &mut self.chips[ChipId::Rom as usize];

        rom.enabled = reg.en();
        rom.read_only = reg.ro();
        rom.size = (128 * KIB) << reg.siz();

        // CSA is now just a normal chip select
        if rom.enabled && rom.in_boot_mode {
            info!("ROM chip select enabled, leaving boot mode");
            rom.in_boot_mode = false;
        }

        regs.write16(CSA, value & 0x81ff);
    }

    pub fn set_csb(&mut self, regs: &mut RegisterBus, value: u16) {
        self.set_common_attributes(regs, ChipId::Sed, value);

        let sed = &mut self.chips[ChipId::Sed as usize];
        sed.size = (32 * KIB) << ChipSelectRegister(value).siz();

        regs.write16(CSB, value & 0xf9ff);
    }

    pub fn set_csc(&mut self, regs: &mut RegisterBus, value: u16) {
        self.set_common_attributes(regs, ChipId::Usb, value);

        let usb = &mut self.chips[ChipId::Usb as usize];
        usb.size = (32 * KIB) << ChipSelectRegister(value).siz();

        regs.write16(CSC, value & 0xf9ff);
    }

    pub fn set_csd(&mut self, regs: &mut RegisterBus, value: u16) {
        let csctrl1 = regs.read16(CSCTRL1);
        let reg = ChipSelectRegister(value);

        self.set_common_attributes(regs, ChipId::Ram, value);

        let ram = &mut self.chips[ChipId::Ram as usize];

        // With DSIZ3 the size field of a DRAM chip select is a single bit in 8MB units
        ram.size = if csctrl1 & CSCTRL1_DSIZ3 != 0 && reg.dram() {
            (8 * MIB) << (reg.siz() & 1)
        } else {
            (32 * KIB) << reg.siz()
        };

        regs.write16(CSD, value);
    }

    /// Enable, read-only and protection attributes shared by CSB, CSC and CSD
    fn set_common_attributes(&mut self, regs: &RegisterBus, id: ChipId, value: u16) {
        let csctrl1 = regs.read16(CSCTRL1);
        let reg = ChipSelectRegister(value);
        let chip = &mut self.chips[id as usize];

        chip.enabled = reg.en();
        chip.read_only = reg.ro();
        chip.supervisor_only_protected = reg.sop();
        chip.read_only_protected = reg.rop();
        chip.unprotected_size = unprotected_size(csctrl1, id, value);
    }

    pub fn set_csgba(&mut self, regs: &mut RegisterBus, value: u16) {
        self.set_base(regs, ChipId::Rom, value);
    }

    pub fn set_csgbb(&mut self, regs: &mut RegisterBus, value: u16) {
        self.set_base(regs, ChipId::Sed, value);
    }

    pub fn set_csgbc(&mut self, regs: &mut RegisterBus, value: u16) {
        self.set_base(regs, ChipId::Usb, value);
    }

    pub fn set_csgbd(&mut self, regs: &mut RegisterBus, value: u16) {
        self.set_base(regs, ChipId::Ram, value);
    }

    fn set_base(&mut self, regs: &mut RegisterBus, id: ChipId, value: u16) {
        let csugba = regs.read16(CSUGBA);

        self.chips[id as usize].start = base_address(csugba, id, value);

        regs.write16(id.base_register(), value & CSGB_WRITE_MASK);
    }

    pub fn set_csctrl1(&mut self, regs: &mut RegisterBus, value: u16) {
        let old = regs.read16(CSCTRL1);

        regs.write16(CSCTRL1, value & CSCTRL1_WRITE_MASK);

        if (old ^ value) & CSCTRL1_DEPENDENT_BITS != 0 {
            // CSA doesn't depend on CSCTRL1
            self.rederive(regs, &[ChipId::Sed, ChipId::Usb, ChipId::Ram]);
        }
    }

    pub fn set_csugba(&mut self, regs: &mut RegisterBus, value: u16) {
        let old = regs.read16(CSUGBA);
        let value = value & CSUGBA_WRITE_MASK;

        regs.write16(CSUGBA, value);

        if old != value {
            for chip in CHIPS {
                let base = regs.read16(chip.base_register());

                self.set_base(regs, chip, base);
            }
        }
    }

    /// Re-run the chip select setters of `chips` with their stored register values
    fn rederive(&mut self, regs: &mut RegisterBus, chips: &[ChipId]) {
        for &chip in chips {
            let value = regs.read16(chip.cs_register());

            match chip {
                ChipId::Rom => self.set_csa(regs, value),
                ChipId::Sed => self.set_csb(regs, value),
                ChipId::Usb => self.set_csc(regs, value),
                ChipId::Ram => self.set_csd(regs, value),
            }
        }
    }

    /// Find the chip answering for `addr`. In boot mode the ROM is mirrored over the entire
    /// address space, otherwise the first enabled chip containing the address wins.
    pub fn decode(&self, addr: u32) -> Option<ChipMapping> {
        let rom = self.chip(ChipId::Rom);

        if rom.in_boot_mode {
            return Some(ChipMapping {
                chip: ChipId::Rom,
                offset: addr & (rom.size - 1),
            });
        }

        CHIPS.iter().find_map(|&id| {
            let chip = self.chip(id);

            if !chip.enabled {
                return None;
            }

            chip.contains(addr)
                .map(|offset| ChipMapping { chip: id, offset })
        })
    }
}

impl Default for ChipSelect {
    fn default() -> ChipSelect {
        ChipSelect::new()
    }
}

/// Unprotected size of chip `id` for chip select value `value`. When CSCTRL1 enables UPSIZ along
/// with the chip's own bit the 2-bit field selects from the upper half of the range.
pub fn unprotected_size(csctrl1: u16, id: ChipId, value: u16) -> u32 {
    let mut ups = u32::from(ChipSelectRegister(value).ups());

    if let Some(bit) = id.upsiz_bit() {
        if csctrl1 & CSCTRL1_UPSIZ != 0 && csctrl1 & bit != 0 {
            ups |= 4;
        }
    }

    let size = (32 * KIB) << ups;

    debug_assert!(size.is_power_of_two());

    size
}

/// Start address of chip `id` for group base value `value`
pub fn base_address(csugba: u16, id: ChipId, value: u16) -> u32 {
    let mut start = u32::from(value >> 1) << 14;

    if csugba.bit(CSUGBA_UGEN) {
        start |= csugba.field(id.upper_base_shift(), 3) << 29;
    }

    start
}

#[cfg(test)]
mod test {
    use super::*;

    fn reset() -> (ChipSelect, RegisterBus) {
        let mut regs = RegisterBus::new();
        let mut cs = ChipSelect::new();

        cs.reset(&mut regs);

        (cs, regs)
    }

    #[test]
    fn reset_state() {
        let (cs, regs) = reset();

        let rom = cs.chip(ChipId::Rom);
        assert!(rom.enabled);
        assert!(rom.in_boot_mode);
        assert_eq!(rom.size, 128 * KIB);
        assert_eq!(regs.read16(CSA), CSA_RESET);

        assert!(!cs.chip(ChipId::Ram).enabled);
        assert_eq!(cs.chip(ChipId::Ram).size, 32 * KIB);
    }

    #[test]
    fn boot_mode_is_one_shot() {
        let (mut cs, mut regs) = reset();

        // Writing CSA without the enable bit doesn't leave boot mode
        cs.set_csa(&mut regs, 0x0006);
        assert!(cs.chip(ChipId::Rom).in_boot_mode);
        assert_eq!(cs.decode(0x1234_5678).map(|m| m.chip), Some(ChipId::Rom));

        cs.set_csa(&mut regs, 0x0007);
        assert!(!cs.chip(ChipId::Rom).in_boot_mode);
        assert_eq!(cs.chip(ChipId::Rom).size, 128 * KIB << 3);

        // Disabling and re-enabling doesn't re-arm it
        cs.set_csa(&mut regs, 0x0000);
        cs.set_csa(&mut regs, 0x0001);
        assert!(!cs.chip(ChipId::Rom).in_boot_mode);
    }

    #[test]
    fn cs_write_masks() {
        let (mut cs, mut regs) = reset();

        cs.set_csa(&mut regs, 0xffff);
        cs.set_csb(&mut regs, 0xffff);
        cs.set_csc(&mut regs, 0xffff);
        cs.set_csd(&mut regs, 0xffff);

        assert_eq!(regs.read16(CSA), 0x81ff);
        assert_eq!(regs.read16(CSB), 0xf9ff);
        assert_eq!(regs.read16(CSC), 0xf9ff);
        assert_eq!(regs.read16(CSD), 0xffff);
    }

    #[test]
    fn chip_select_setters_are_idempotent() {
        let (mut cs, mut regs) = reset();

        cs.set_csctrl1(&mut regs, 0x4055);

        for value in [0x0000u16, 0x0001, 0x6803, 0xf9ff, 0x1e0f, 0xffff] {
            cs.set_csa(&mut regs, value);
            let first = *cs.chip(ChipId::Rom);
            cs.set_csa(&mut regs, value);
            assert_eq!(*cs.chip(ChipId::Rom), first);

            cs.set_csb(&mut regs, value);
            let first = *cs.chip(ChipId::Sed);
            cs.set_csb(&mut regs, value);
            assert_eq!(*cs.chip(ChipId::Sed), first);

            cs.set_csc(&mut regs, value);
            let first = *cs.chip(ChipId::Usb);
            cs.set_csc(&mut regs, value);
            assert_eq!(*cs.chip(ChipId::Usb), first);

            cs.set_csd(&mut regs, value);
            let first = *cs.chip(ChipId::Ram);
            cs.set_csd(&mut regs, value);
            assert_eq!(*cs.chip(ChipId::Ram), first);
        }
    }

    #[test]
    fn attributes_and_sizes() {
        let (mut cs, mut regs) = reset();

        // Enabled, 32KiB << 2, UPS = 1, ROP, SOP
        cs.set_csc(&mut regs, 0x6805);

        let usb = cs.chip(ChipId::Usb);
        assert!(usb.enabled);
        assert!(!usb.read_only);
        assert_eq!(usb.size, 128 * KIB);
        assert_eq!(usb.unprotected_size, 64 * KIB);
        assert!(usb.supervisor_only_protected);
        assert!(usb.read_only_protected);
    }

    #[test]
    fn ram_large_dram_encoding() {
        let (mut cs, mut regs) = reset();

        // DRAM bit and size field 3 (LSB set)
        cs.set_csd(&mut regs, 0x0207);
        assert_eq!(cs.chip(ChipId::Ram).size, 32 * KIB << 3);

        // DSIZ3 switches to the 8MB encoding, re-deriving CSD on the spot
        cs.set_csctrl1(&mut regs, 0x0040);
        assert_eq!(cs.chip(ChipId::Ram).size, 16 * MIB);

        // Without the DRAM bit the regular encoding stays in effect
        cs.set_csd(&mut regs, 0x0007);
        assert_eq!(cs.chip(ChipId::Ram).size, 32 * KIB << 3);
    }

    #[test]
    fn csctrl1_rederives_unprotected_sizes() {
        let (mut cs, mut regs) = reset();

        let values = [(ChipId::Sed, 0x1801u16), (ChipId::Usb, 0x0801), (ChipId::Ram, 0x1001)];

        cs.set_csb(&mut regs, values[0].1);
        cs.set_csc(&mut regs, values[1].1);
        cs.set_csd(&mut regs, values[2].1);

        for csctrl1 in [0x4000u16, 0x4001, 0x4055, 0x0015, 0x4014, 0x0000, 0x7f55] {
            cs.set_csctrl1(&mut regs, csctrl1);

            let stored = regs.read16(CSCTRL1);
            assert_eq!(stored, csctrl1 & CSCTRL1_WRITE_MASK);

            for &(id, value) in &values {
                assert_eq!(
                    cs.chip(id).unprotected_size,
                    unprotected_size(stored, id, value),
                    "{:?} with CSCTRL1 0x{:04x}",
                    id,
                    csctrl1
                );
            }
        }

        cs.set_csctrl1(&mut regs, 0x4055);
        assert_eq!(cs.chip(ChipId::Sed).unprotected_size, 32 * KIB << 7);
        assert_eq!(cs.chip(ChipId::Usb).unprotected_size, 32 * KIB << 5);
        assert_eq!(cs.chip(ChipId::Ram).unprotected_size, 32 * KIB << 6);
    }

    #[test]
    fn base_addresses() {
        let (mut cs, mut regs) = reset();

        cs.set_csgbd(&mut regs, 0x0201);
        assert_eq!(cs.chip(ChipId::Ram).start, 0x0100 << 14);
        assert_eq!(regs.read16(CSGBD), 0x0200);

        // Upper bits, each chip reads its own field
        cs.set_csugba(&mut regs, 0x9123);
        assert_eq!(cs.chip(ChipId::Rom).start, 1 << 29);
        assert_eq!(cs.chip(ChipId::Sed).start, 1 << 29);
        assert_eq!(cs.chip(ChipId::Usb).start, 2 << 29);
        assert_eq!(cs.chip(ChipId::Ram).start, (3 << 29) | (0x0100 << 14));

        // Disabling the upper bits re-derives every base
        cs.set_csugba(&mut regs, 0x1123);
        assert_eq!(cs.chip(ChipId::Rom).start, 0);
        assert_eq!(cs.chip(ChipId::Usb).start, 0);
        assert_eq!(cs.chip(ChipId::Ram).start, 0x0100 << 14);
    }

    #[test]
    fn decode_after_boot() {
        let (mut cs, mut regs) = reset();

        cs.set_csgba(&mut regs, 0x2000);
        cs.set_csa(&mut regs, 0x0003);
        cs.set_csgbd(&mut regs, 0x0000);
        cs.set_csd(&mut regs, 0x0209);

        let rom_start = cs.chip(ChipId::Rom).start;

        assert_eq!(
            cs.decode(rom_start + 0x10),
            Some(ChipMapping {
                chip: ChipId::Rom,
                offset: 0x10
            })
        );
        assert_eq!(
            cs.decode(0x0000_4000),
            Some(ChipMapping {
                chip: ChipId::Ram,
                offset: 0x4000
            })
        );
        assert_eq!(cs.decode(0x0800_0000), None);
    }
}
