//! System control register and bus protection
//!
//! Protection violations never fault: the offending access is dropped and a sticky flag is
//! latched in SCR for the guest to find. The flags are cleared by writing 1 to them.

use bitfield::bitfield;

use super::chip_select::ChipMapping;
use super::map::REGISTER_WINDOW_BASE;
use super::registers::{REGISTER_WINDOW_SIZE, SCR};
use super::Soc;

pub const SCR_RESET: u8 = 0x1c;

/// BETO, PRV and WPV
const VIOLATION_FLAGS: u8 = 0xe0;

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Scr(u8);
    impl Debug;

    ///  0     Data bus width of the register window (read-only here)
    pub bool, wdth8, _: 0;
    ///  2     Double map: registers also decode at 0xXXFFFxxx
    pub bool, dmap, _: 2;
    ///  3     Supervisor-only register window
    pub bool, so, _: 3;
    ///  4     Bus error timeout enable
    pub bool, beten, _: 4;
    ///  5     Write protect violation
    pub bool, wpv, _: 5;
    ///  6     Privilege violation
    pub bool, prv, _: 6;
    ///  7     Bus error timeout
    pub bool, beto, _: 7;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    BusErrorTimeout = 7,
    Privilege = 6,
    WriteProtect = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

pub fn scr(soc: &Soc) -> Scr {
    Scr(soc.regs.read8(SCR))
}

pub fn set_scr(soc: &mut Soc, value: u8) {
    let old = soc.regs.read8(SCR);

    // Violation flags are sticky, writing 1 acknowledges them
    let flags = old & VIOLATION_FLAGS & !value;

    soc.regs.write8(SCR, (value & !VIOLATION_FLAGS) | flags);
}

pub fn flag_violation(soc: &mut Soc, violation: Violation) {
    let scr = soc.regs.read8(SCR);

    soc.regs.write8(SCR, scr | (1 << violation as u8));
}

/// Return the offset in the register window if `addr` targets it. With DMAP set the top byte of
/// the address is ignored.
pub fn register_offset(soc: &Soc, addr: u32) -> Option<u32> {
    let window = !(REGISTER_WINDOW_SIZE as u32 - 1);

    let decode_mask = if scr(soc).dmap() {
        window & 0x00ff_ffff
    } else {
        window
    };

    if addr & decode_mask == REGISTER_WINDOW_BASE & decode_mask {
        Some(addr & !window)
    } else {
        None
    }
}

/// Returns false (and flags a privilege violation) if a user mode access hits the register
/// window while it's supervisor-only
pub fn check_register_access(soc: &mut Soc, supervisor: bool) -> bool {
    if !supervisor && scr(soc).so() {
        warn!("User mode access to supervisor-only registers");
        flag_violation(soc, Violation::Privilege);
        return false;
    }

    true
}

/// Decode a memory access through the chip selects and enforce the chip's protection
/// attributes. Rejected accesses return `None` after latching the matching SCR flag.
pub fn map_access(
    soc: &mut Soc,
    addr: u32,
    kind: AccessKind,
    supervisor: bool,
) -> Option<ChipMapping> {
    let mapping = match soc.chip_select.decode(addr) {
        Some(m) => m,
        None => {
            if scr(soc).beten() {
                debug!("Bus error timeout at 0x{:08x}", addr);
                flag_violation(soc, Violation::BusErrorTimeout);
            }
            return None;
        }
    };

    let chip = *soc.chip_select.chip(mapping.chip);
    let protected = chip.is_protected(mapping.offset);

    if kind == AccessKind::Write
        && (chip.read_only || (protected && chip.read_only_protected))
    {
        warn!("Write to read-only {:?} at 0x{:08x}", mapping.chip, addr);
        flag_violation(soc, Violation::WriteProtect);
        return None;
    }

    if !supervisor && protected && chip.supervisor_only_protected {
        warn!("User mode access to protected {:?} at 0x{:08x}", mapping.chip, addr);
        flag_violation(soc, Violation::Privilege);
        return None;
    }

    Some(mapping)
}
