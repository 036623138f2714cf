//! DragonBall-style SoC peripheral core
//!
//! `Soc` owns every peripheral. The CPU core (not part of this crate) drives it through `load`,
//! `store` and `run`, everything else happens in reaction to these calls.

pub mod addressable;
pub mod chip_select;
pub mod clock;
pub mod cpu;
pub mod irq;
pub mod map;
pub mod registers;
pub mod ssp;
pub mod system_control;
pub mod timing;

#[cfg(test)]
mod test;
#[cfg(test)]
pub(crate) mod test_util;

use log::Level;

use crate::error::PalmResult;
use crate::settings::Settings;
use addressable::{AccessWidth, Addressable};
use chip_select::{ChipMapping, ChipSelect};
use clock::Clock;
use cpu::CpuControl;
use irq::{InterruptController, InterruptState, NoController};
use registers::*;
use ssp::{Ssp, WiredDevice};
use system_control::AccessKind;
use timing::TimingQueue;

/// Emulated CPU cycles since reset
pub type CycleCount = u64;

/// Registers of the window that have side effects or need sanitizing, along with their width.
/// Everything else in the window is unimplemented.
const REGISTER_MAP: [(u32, AccessWidth); 19] = [
    (SCR, AccessWidth::Byte),
    (CSGBA, AccessWidth::HalfWord),
    (CSGBB, AccessWidth::HalfWord),
    (CSGBC, AccessWidth::HalfWord),
    (CSGBD, AccessWidth::HalfWord),
    (CSUGBA, AccessWidth::HalfWord),
    (CSCTRL1, AccessWidth::HalfWord),
    (CSA, AccessWidth::HalfWord),
    (CSB, AccessWidth::HalfWord),
    (CSC, AccessWidth::HalfWord),
    (CSD, AccessWidth::HalfWord),
    (CSCTRL2, AccessWidth::HalfWord),
    (CSCTRL3, AccessWidth::HalfWord),
    (PLLCR, AccessWidth::HalfWord),
    (PLLFSR, AccessWidth::HalfWord),
    (IMR, AccessWidth::Word),
    (ISR, AccessWidth::Word),
    (IPR, AccessWidth::Word),
    (ILCR, AccessWidth::HalfWord),
];

/// Offset of the `i`th byte of an access starting at `off`, wrapping at the end of the window
fn window_offset(off: u32, i: u32) -> u32 {
    off.wrapping_add(i) & (REGISTER_WINDOW_SIZE as u32 - 1)
}

/// Return the base offset and width of the register containing byte `off`
fn register_at(off: u32) -> Option<(u32, u32)> {
    REGISTER_MAP.iter().find_map(|&(base, width)| {
        let width = width as u32;

        if off >= base && off < base + width {
            Some((base, width))
        } else {
            None
        }
    })
}

pub struct Soc {
    pub(crate) settings: Settings,
    pub(crate) regs: RegisterBus,
    pub(crate) chip_select: ChipSelect,
    pub(crate) clock: Clock,
    pub(crate) irq: InterruptState,
    pub(crate) ssp: Ssp,
    pub(crate) timing: TimingQueue,
    /// Device on the other end of the SSP
    pub(crate) ssp_device: Box<dyn WiredDevice>,
    /// Receives the chip-wide interrupt lines
    pub(crate) interrupt_controller: Box<dyn InterruptController>,
}

impl Soc {
    pub fn new(settings: Settings) -> PalmResult<Soc> {
        settings.validate()?;

        let mut soc = Soc {
            clock: Clock::new(settings.crystal_frequency),
            ssp_device: ssp::from_kind(settings.ssp_device),
            settings,
            regs: RegisterBus::new(),
            chip_select: ChipSelect::new(),
            irq: InterruptState::new(),
            ssp: Ssp::new(),
            timing: TimingQueue::new(),
            interrupt_controller: Box::new(NoController),
        };

        soc.reset();

        info!(
            "SoC ready, CPU at {}Hz, SSP wired to {}",
            soc.clock.cpu_frequency(),
            soc.ssp_device.description()
        );

        Ok(soc)
    }

    /// Put every peripheral back in its power-on state. Pending timed events are dropped.
    pub fn reset(&mut self) {
        self.regs.clear();

        self.regs.write8(SCR, system_control::SCR_RESET);
        self.regs.write16(PLLCR, clock::PLLCR_RESET);
        self.regs.write16(PLLFSR, clock::PLLFSR_RESET);
        self.clock = Clock::new(self.settings.crystal_frequency);

        self.chip_select.reset(&mut self.regs);
        self.timing.clear();
        self.ssp.reset();

        irq::reset(self);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registers(&self) -> &RegisterBus {
        &self.regs
    }

    pub fn chip_select(&self) -> &ChipSelect {
        &self.chip_select
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn irq(&self) -> &InterruptState {
        &self.irq
    }

    pub fn ssp(&self) -> &Ssp {
        &self.ssp
    }

    pub fn timing(&self) -> &TimingQueue {
        &self.timing
    }

    /// Current emulated date
    pub fn now(&self) -> CycleCount {
        self.timing.now()
    }

    /// Wire a new device to the SSP, returns the previous one
    pub fn connect_ssp_device(&mut self, device: Box<dyn WiredDevice>) -> Box<dyn WiredDevice> {
        info!("SSP device: {}", device.description());

        std::mem::replace(&mut self.ssp_device, device)
    }

    pub fn connect_interrupt_controller(&mut self, controller: Box<dyn InterruptController>) {
        self.interrupt_controller = controller;
    }

    /// Advance emulated time by `cycles`, firing every timed event that becomes due
    pub fn run(&mut self, cycles: CycleCount) {
        timing::run(self, cycles);
    }

    /// Decode a memory access through the chip selects, enforcing the protection attributes
    pub fn map_access(
        &mut self,
        cpu: &dyn CpuControl,
        addr: u32,
        kind: AccessKind,
    ) -> Option<ChipMapping> {
        system_control::map_access(self, addr, kind, cpu.supervisor())
    }

    pub fn load<T: Addressable>(&mut self, cpu: &mut dyn CpuControl, addr: u32) -> T {
        if let Some(off) = system_control::register_offset(self, addr) {
            if !system_control::check_register_access(self, cpu.supervisor()) {
                return T::from_u32(0);
            }

            return self.load_register(off);
        }

        if let Some(off) = map::SSP.contains(addr) {
            return ssp::load(self, off);
        }

        log!(
            self.unhandled_level(),
            "Unmapped {:?} read at 0x{:08x}",
            T::width(),
            addr
        );

        T::from_u32(0)
    }

    pub fn store<T: Addressable>(&mut self, cpu: &mut dyn CpuControl, addr: u32, val: T) {
        if let Some(off) = system_control::register_offset(self, addr) {
            if system_control::check_register_access(self, cpu.supervisor()) {
                self.store_register(cpu, off, val);
            }
            return;
        }

        if let Some(off) = map::SSP.contains(addr) {
            ssp::store(self, off, val);
            return;
        }

        log!(
            self.unhandled_level(),
            "Unmapped {:?} write at 0x{:08x}: 0x{:x}",
            T::width(),
            addr,
            val.as_u32()
        );
    }

    fn unhandled_level(&self) -> Level {
        if self.settings.register_access_warnings {
            Level::Warn
        } else {
            Level::Debug
        }
    }

    fn load_register<T: Addressable>(&mut self, off: u32) -> T {
        let width = T::width() as u32;

        // Every implemented register mirrors its state in the bus and nothing else is ever
        // written there, so unimplemented bytes read back as 0.
        if !(0..width).any(|i| register_at(window_offset(off, i)).is_some()) {
            log!(
                self.unhandled_level(),
                "Unimplemented register {:?} read at 0x{:03x}",
                T::width(),
                off
            );
        }

        self.regs.read(off)
    }

    /// Write `val` at `off`, splitting it over several registers or merging it into the
    /// current value as needed
    fn store_register<T: Addressable>(&mut self, cpu: &mut dyn CpuControl, off: u32, val: T) {
        let width = T::width() as u32;
        let bytes = val.as_u32().to_be_bytes();
        let bytes = &bytes[(4 - width) as usize..];

        let mut i = 0;
        while i < width {
            let at = window_offset(off, i);

            let Some((base, reg_width)) = register_at(at) else {
                log!(
                    self.unhandled_level(),
                    "Unimplemented register write at 0x{:03x}: 0x{:02x}",
                    at,
                    bytes[i as usize]
                );
                i += 1;
                continue;
            };

            // ISR bits are acknowledged by writing 1, the bytes we don't touch must not ack
            // anything
            let mut value = if base == ISR {
                0
            } else {
                self.read_raw(base, reg_width)
            };

            while i < width {
                let at = window_offset(off, i);
                if at < base || at >= base + reg_width {
                    break;
                }

                let shift = (base + reg_width - 1 - at) * 8;

                value &= !(0xff << shift);
                value |= u32::from(bytes[i as usize]) << shift;

                i += 1;
            }

            self.write_register(cpu, base, value);
        }
    }

    fn read_raw(&self, base: u32, width: u32) -> u32 {
        match width {
            1 => u32::from(self.regs.read8(base)),
            2 => u32::from(self.regs.read16(base)),
            _ => self.regs.read32(base),
        }
    }

    fn write_register(&mut self, cpu: &mut dyn CpuControl, base: u32, value: u32) {
        let v16 = value as u16;

        match base {
            SCR => system_control::set_scr(self, value as u8),
            CSGBA => self.chip_select.set_csgba(&mut self.regs, v16),
            CSGBB => self.chip_select.set_csgbb(&mut self.regs, v16),
            CSGBC => self.chip_select.set_csgbc(&mut self.regs, v16),
            CSGBD => self.chip_select.set_csgbd(&mut self.regs, v16),
            CSUGBA => self.chip_select.set_csugba(&mut self.regs, v16),
            CSCTRL1 => self.chip_select.set_csctrl1(&mut self.regs, v16),
            CSA => self.chip_select.set_csa(&mut self.regs, v16),
            CSB => self.chip_select.set_csb(&mut self.regs, v16),
            CSC => self.chip_select.set_csc(&mut self.regs, v16),
            CSD => self.chip_select.set_csd(&mut self.regs, v16),
            CSCTRL2 | CSCTRL3 => self.regs.write16(base, v16),
            PLLCR => clock::set_pllcr(self, cpu, v16),
            PLLFSR => clock::set_pllfsr(self, v16),
            IMR => irq::set_mask(self, value),
            ISR => irq::ack(self, value),
            ILCR => irq::set_ilcr(self, v16),
            IPR => debug!("Write to read-only IPR: 0x{:08x}", value),
            _ => log!(
                self.unhandled_level(),
                "Unimplemented register write at 0x{:03x}: 0x{:x}",
                base,
                value
            ),
        }
    }
}
