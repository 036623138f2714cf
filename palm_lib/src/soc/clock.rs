//! PLL and CPU clock model
//!
//! The CPU clock is derived from the 32.768kHz crystal by the PLL. We express it as the number of
//! CPU cycles per crystal tick which is what the CPU core collaborator needs to pace itself.

use bitfield::bitfield;

use super::cpu::CpuControl;
use super::registers::{PLLCR, PLLFSR};
use super::{CycleCount, Soc};

pub const PLLCR_RESET: u16 = 0x24b3;
pub const PLLFSR_RESET: u16 = 0x0347;

/// The PLL shuts down 30 SYSCLK cycles after DISPLL is set
pub const PLL_SHUTDOWN_DELAY: CycleCount = 30;

const PLLCR_WRITE_MASK: u16 = 0x3fbb;
const PLLFSR_WRITE_MASK: u16 = 0x4fff;

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Pllfsr(u16);
    impl Debug;

    ///  0-7   P count
    pub u8, p, _: 7, 0;
    ///  8-11  Q count
    pub u8, q, _: 11, 8;
    ///  14    Frequency protect, once set the register is locked until reset
    pub bool, prot, _: 14;
    ///  15    CLK32 signal level, read-only
    pub bool, clk32, _: 15;
}

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Pllcr(u16);
    impl Debug;

    ///  3     Disable PLL
    pub bool, displl, _: 3;
    ///  7     Prescaler 1: divide the VCO output by 2
    pub bool, presc1, _: 7;
}

/// PLL configuration decoded from PLLFSR and PLLCR
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllParameters {
    pub p: u8,
    pub q: u8,
    pub prescaler_doubled: bool,
    pub frequency_protect_locked: bool,
}

impl PllParameters {
    pub fn from_registers(pllfsr: u16, pllcr: u16) -> PllParameters {
        let fsr = Pllfsr(pllfsr);

        PllParameters {
            p: fsr.p(),
            q: fsr.q(),
            prescaler_doubled: Pllcr(pllcr).presc1(),
            frequency_protect_locked: fsr.prot(),
        }
    }

    pub fn cycles_per_crystal_tick(&self) -> f64 {
        let prescaler = if self.prescaler_doubled { 2.0 } else { 1.0 };
        let p = f64::from(self.p);
        let q = f64::from(self.q);

        2.0 * (14.0 * (p + 1.0) + q + 1.0) / prescaler
    }
}

pub struct Clock {
    /// Reference crystal frequency in Hz
    crystal_frequency: u32,
    /// CPU cycles per crystal tick
    cycles_per_crystal_tick: f64,
}

impl Clock {
    pub fn new(crystal_frequency: u32) -> Clock {
        let params = PllParameters::from_registers(PLLFSR_RESET, PLLCR_RESET);

        Clock {
            crystal_frequency,
            cycles_per_crystal_tick: params.cycles_per_crystal_tick(),
        }
    }

    pub fn recompute(&mut self, params: PllParameters) {
        self.cycles_per_crystal_tick = params.cycles_per_crystal_tick();

        debug!(
            "New CPU frequency: {}Hz ({} cycles per crystal tick)",
            self.cpu_frequency(),
            self.cycles_per_crystal_tick
        );
    }

    pub fn cycles_per_crystal_tick(&self) -> f64 {
        self.cycles_per_crystal_tick
    }

    pub fn crystal_frequency(&self) -> u32 {
        self.crystal_frequency
    }

    pub fn cpu_frequency(&self) -> f64 {
        f64::from(self.crystal_frequency) * self.cycles_per_crystal_tick
    }
}

pub fn set_pllfsr(soc: &mut Soc, value: u16) {
    let old = soc.regs.read16(PLLFSR);
    let current = PllParameters::from_registers(old, soc.regs.read16(PLLCR));

    if current.frequency_protect_locked {
        debug!("PLLFSR write 0x{:04x} while frequency protect is set", value);
        return;
    }

    // CLK32 is driven by the crystal, not by software
    let pllfsr = (value & PLLFSR_WRITE_MASK) | (old & 0x8000);

    soc.regs.write16(PLLFSR, pllfsr);

    let params = PllParameters::from_registers(pllfsr, soc.regs.read16(PLLCR));
    soc.clock.recompute(params);
}

pub fn set_pllcr(soc: &mut Soc, cpu: &mut dyn CpuControl, value: u16) {
    let pllcr = value & PLLCR_WRITE_MASK;

    soc.regs.write16(PLLCR, pllcr);

    let params = PllParameters::from_registers(soc.regs.read16(PLLFSR), pllcr);
    soc.clock.recompute(params);

    if Pllcr(pllcr).displl() {
        info!("PLL disabled, CPU stops in {} cycles", PLL_SHUTDOWN_DELAY);
        cpu.shorten_timeslice(PLL_SHUTDOWN_DELAY);
    }
}

#[test]
fn pll_formula() {
    let mut params = PllParameters {
        p: 0,
        q: 0,
        prescaler_doubled: false,
        frequency_protect_locked: false,
    };

    assert_eq!(params.cycles_per_crystal_tick(), 30.0);

    params.prescaler_doubled = true;
    assert_eq!(params.cycles_per_crystal_tick(), 15.0);
}

#[test]
fn pll_parameters_decode() {
    // P = 0x12, Q = 5, frequency protect set, prescaler 1
    let params = PllParameters::from_registers(0x4512, 0x0080);

    assert_eq!(params.p, 0x12);
    assert_eq!(params.q, 5);
    assert!(params.prescaler_doubled);
    assert!(params.frequency_protect_locked);

    assert!(!PllParameters::from_registers(0x0347, 0).frequency_protect_locked);
}

#[test]
fn pll_reset_frequency() {
    let clock = Clock::new(32768);

    // P = 0x47, Q = 3 with the prescaler enabled
    assert_eq!(clock.cycles_per_crystal_tick(), 1012.0);
    assert_eq!(clock.cpu_frequency(), 32768.0 * 1012.0);
}
