//! Interrupt aggregation
//!
//! Peripherals never touch the status bits directly: they drive their line through
//! `set_level`, which latches the pending bit and recomputes the visible status against the
//! mask straight away. IPR, ISR and IMR in the register window are refreshed on every change.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::registers::{ILCR, IMR, IPR, ISR};
use super::Soc;
use crate::bitwise::Bitwise;

/// Every source is masked after reset
pub const IMR_RESET: u32 = 0x00ff_ffff;
pub const ILCR_RESET: u16 = 0x6533;

/// Sources whose pending bit follows the peripheral's own output and can't be acknowledged
/// through ISR
pub const LEVEL_SENSITIVE: u32 = 1 << Interrupt::Ssp as u32;

/// Interrupt sources, numbered by their bit in IPR/ISR/IMR
#[derive(FromPrimitive, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    /// SPI master 2
    Spi2 = 0,
    Timer1 = 1,
    Uart1 = 2,
    Watchdog = 3,
    Rtc = 4,
    Keyboard = 6,
    Pwm1 = 7,
    Int0 = 8,
    Int1 = 9,
    Int2 = 10,
    Int3 = 11,
    Pwm2 = 13,
    Irq1 = 16,
    Irq2 = 17,
    Irq3 = 18,
    Irq6 = 19,
    Irq5 = 20,
    /// Synchronous serial port, wired to the SPI1 slot
    Ssp = 21,
    Timer2 = 22,
    Uart2 = 23,
}

impl Interrupt {
    pub fn mask(self) -> u32 {
        1 << self as u32
    }
}

/// Level of a peripheral's interrupt output. Must be checked so that a state change can't be
/// silently dropped.
#[must_use]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum IrqState {
    Idle,
    Active,
}

impl IrqState {
    pub fn is_active(self) -> bool {
        self == IrqState::Active
    }
}

impl From<bool> for IrqState {
    fn from(active: bool) -> IrqState {
        if active {
            IrqState::Active
        } else {
            IrqState::Idle
        }
    }
}

/// Collaborator receiving the chip-wide interrupt lines, normally the CPU core
pub trait InterruptController {
    /// Called every time the visible status of `source` changes
    fn raise_interrupt_line(&mut self, source: Interrupt, asserted: bool);
}

/// Controller used when nothing is listening
pub struct NoController;

impl InterruptController for NoController {
    fn raise_interrupt_line(&mut self, _: Interrupt, _: bool) {}
}

pub struct InterruptState {
    /// Latched interrupt requests
    pending: u32,
    /// Masked sources
    mask: u32,
    /// `pending & !mask`, always recomputed on the spot
    status: u32,
    /// Programmable levels for SPI1, UART2, PWM2 and TMR2
    ilcr: u16,
}

impl InterruptState {
    pub fn new() -> InterruptState {
        InterruptState {
            pending: 0,
            mask: IMR_RESET,
            status: 0,
            ilcr: ILCR_RESET,
        }
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn ilcr(&self) -> u16 {
        self.ilcr
    }

    /// Returns true if `which` is pending and unmasked
    pub fn is_active(&self, which: Interrupt) -> bool {
        self.status & which.mask() != 0
    }

    /// Each of these returns the status bits that changed
    pub fn set_pending(&mut self, bits: u32) -> u32 {
        self.pending |= bits;
        self.refresh()
    }

    pub fn clear_pending(&mut self, bits: u32) -> u32 {
        self.pending &= !bits;
        self.refresh()
    }

    pub fn set_mask(&mut self, mask: u32) -> u32 {
        self.mask = mask;
        self.refresh()
    }

    fn refresh(&mut self) -> u32 {
        let prev = self.status;

        self.status = self.pending & !self.mask;

        prev ^ self.status
    }

    /// Update the level control register. A level field of 0 or 7 is not accepted by the
    /// hardware and the previous level is kept.
    pub fn set_ilcr(&mut self, value: u16) -> u16 {
        let mut ilcr = 0;

        for shift in [12u8, 8, 4, 0] {
            let field_mask = 7u16 << shift;
            let level = value.field(shift, 3);

            ilcr |= if level != 0 && level != 7 {
                value & field_mask
            } else {
                self.ilcr & field_mask
            };
        }

        self.ilcr = ilcr;

        ilcr
    }

    /// Priority level of `which`
    pub fn level(&self, which: Interrupt) -> u8 {
        let programmable = |shift| self.ilcr.field(shift, 3) as u8;

        match which {
            Interrupt::Ssp => programmable(12),
            Interrupt::Uart2 => programmable(8),
            Interrupt::Pwm2 => programmable(4),
            Interrupt::Timer2 => programmable(0),
            Interrupt::Irq1 => 1,
            Interrupt::Irq2 => 2,
            Interrupt::Irq3 => 3,
            Interrupt::Irq5 => 5,
            Interrupt::Irq6 | Interrupt::Timer1 => 6,
            Interrupt::Watchdog => 7,
            _ => 4,
        }
    }

    /// Highest level among the active sources, 0 if nothing is active
    pub fn highest_level(&self) -> u8 {
        (0..32)
            .filter(|&bit| self.status.bit(bit))
            .filter_map(|bit| Interrupt::from_u8(bit))
            .map(|which| self.level(which))
            .max()
            .unwrap_or(0)
    }
}

impl Default for InterruptState {
    fn default() -> InterruptState {
        InterruptState::new()
    }
}

/// Back to the power-on state. Lines that were active are reported as dropped.
pub fn reset(soc: &mut Soc) {
    let changed = soc.irq.status();

    soc.irq = InterruptState::new();
    soc.regs.write16(ILCR, ILCR_RESET);

    commit(soc, changed);
}

/// Drive the line of a level-sensitive source
pub fn set_level(soc: &mut Soc, which: Interrupt, asserted: bool) {
    let changed = if asserted {
        soc.irq.set_pending(which.mask())
    } else {
        soc.irq.clear_pending(which.mask())
    };

    commit(soc, changed);
}

/// Latch an edge-triggered request
pub fn trigger(soc: &mut Soc, which: Interrupt) {
    let changed = soc.irq.set_pending(which.mask());

    commit(soc, changed);
}

pub fn set_mask(soc: &mut Soc, mask: u32) {
    let changed = soc.irq.set_mask(mask);

    commit(soc, changed);
}

/// Acknowledge interrupts by writing 1 to the corresponding ISR bit. Level-sensitive sources
/// stay pending for as long as the peripheral drives its line.
pub fn ack(soc: &mut Soc, bits: u32) {
    let ignored = bits & LEVEL_SENSITIVE;
    if ignored != 0 {
        debug!("ISR acknowledge of level-sensitive sources ignored: 0x{:08x}", ignored);
    }

    let changed = soc.irq.clear_pending(bits & !LEVEL_SENSITIVE);

    commit(soc, changed);
}

pub fn set_ilcr(soc: &mut Soc, value: u16) {
    let ilcr = soc.irq.set_ilcr(value);

    soc.regs.write16(ILCR, ilcr);
}

/// Mirror the interrupt state into the register window and forward the lines that moved
fn commit(soc: &mut Soc, changed: u32) {
    soc.regs.write32(IPR, soc.irq.pending());
    soc.regs.write32(ISR, soc.irq.status());
    soc.regs.write32(IMR, soc.irq.mask());

    for bit in (0..32).filter(|&bit| changed.bit(bit)) {
        match Interrupt::from_u8(bit) {
            Some(which) => {
                let asserted = soc.irq.is_active(which);

                soc.interrupt_controller.raise_interrupt_line(which, asserted);
            }
            None => debug!("Status change on unassigned interrupt bit {}", bit),
        }
    }
}

#[test]
fn status_is_pending_and_not_masked() {
    let mut irq = InterruptState::new();

    assert_eq!(irq.set_pending(Interrupt::Ssp.mask()), 0);
    assert_eq!(irq.status(), 0);

    let changed = irq.set_mask(IMR_RESET & !Interrupt::Ssp.mask());
    assert_eq!(changed, Interrupt::Ssp.mask());
    assert!(irq.is_active(Interrupt::Ssp));

    irq.clear_pending(Interrupt::Ssp.mask());
    assert_eq!(irq.status(), 0);
    assert_eq!(irq.pending(), 0);
}

#[test]
fn ilcr_rejects_level_0_and_7() {
    let mut irq = InterruptState::new();

    // SPI1 -> 0 (rejected), UART2 -> 2, PWM2 -> 7 (rejected), TMR2 -> 1
    assert_eq!(irq.set_ilcr(0x0271), 0x6231);
    assert_eq!(irq.level(Interrupt::Ssp), 6);
    assert_eq!(irq.level(Interrupt::Uart2), 2);
    assert_eq!(irq.level(Interrupt::Pwm2), 3);
    assert_eq!(irq.level(Interrupt::Timer2), 1);
}

#[test]
fn highest_level_picks_active_sources_only() {
    let mut irq = InterruptState::new();

    irq.set_mask(0);
    assert_eq!(irq.highest_level(), 0);

    irq.set_pending(Interrupt::Irq2.mask() | Interrupt::Ssp.mask());
    assert_eq!(irq.highest_level(), 6);

    irq.set_mask(Interrupt::Ssp.mask());
    assert_eq!(irq.highest_level(), 2);
}
