//! Synchronous Serial Port
//!
//! Words written to SSDR are queued in the transmit FIFO and shifted out one at a time, each word
//! taking `SSP_TRANSFER_DELAY` cycles. Every transmitted bit is exchanged with the device wired
//! to the port and the bits clocked back in are assembled into a word pushed to the receive FIFO.

mod devices;
mod fifo;


pub use devices::{from_kind, DisconnectedDevice, LoopbackDevice, WiredDevice};
pub use fifo::FIFO_DEPTH;

use bitfield::bitfield;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::addressable::{AccessWidth, Addressable};
use super::irq::{self, Interrupt, IrqState};
use super::timing::TimedEvent;
use super::{CycleCount, Soc};
use crate::bitwise::Bitwise;
use fifo::Fifo;

/// Time it takes to shift a word in and out
pub const SSP_TRANSFER_DELAY: CycleCount = 10;

pub const SSSR_RESET: u16 = 0xf004;

const SSCR1_WRITE_MASK: u16 = 0x3fff;

/// Receive FIFO overrun, write 1 to acknowledge
const SSSR_ROR: u16 = 1 << 7;

#[derive(FromPrimitive, Clone, Copy, Debug, PartialEq, Eq)]
enum Register {
    Sscr0 = 0x00,
    Sscr1 = 0x04,
    Sssr = 0x08,
    Ssdr = 0x10,
}

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Sscr0(u16);
    impl Debug;

    ///  0-3   Data size select, words are DSS + 1 bits long
    pub u8, dss, _: 3, 0;
    ///  4-5   Frame format
    pub u8, frf, _: 5, 4;
    ///  6     External clock select
    pub bool, ecs, _: 6;
    ///  7     Synchronous serial port enable
    pub bool, sse, _: 7;
    ///  8-15  Serial clock rate
    pub u8, scr, _: 15, 8;
}

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Sscr1(u16);
    impl Debug;

    ///  0     Receive FIFO interrupt enable
    pub bool, rie, _: 0;
    ///  1     Transmit FIFO interrupt enable
    pub bool, tie, _: 1;
    ///  2     Loopback mode
    pub bool, lbm, _: 2;
    ///  3     Serial clock polarity
    pub bool, spo, _: 3;
    ///  4     Serial clock phase
    pub bool, sph, _: 4;
    ///  5     Microwire transmit data size
    pub bool, mwds, _: 5;
    ///  6-9   Transmit FIFO threshold
    pub u8, tft, _: 9, 6;
    ///  10-13 Receive FIFO threshold
    pub u8, rft, _: 13, 10;
}

pub struct Ssp {
    sscr0: Sscr0,
    sscr1: Sscr1,
    /// Stored part of SSSR. Only the upper byte is software-writable, the low byte is rebuilt
    /// from the FIFO state on every read.
    sssr: u16,
    rx: Fifo,
    tx: Fifo,
    /// True while a completion event is outstanding
    transferring: bool,
    /// Bumped every time the port is disabled. Completion events carry the generation they were
    /// scheduled with so that the ones belonging to an aborted transfer are ignored.
    generation: u32,
}

impl Ssp {
    pub fn new() -> Ssp {
        Ssp {
            sscr0: Sscr0(0),
            sscr1: Sscr1(0),
            sssr: SSSR_RESET,
            rx: Fifo::new(),
            tx: Fifo::new(),
            transferring: false,
            generation: 0,
        }
    }

    pub fn reset(&mut self) {
        // Keep counting so that events scheduled before the reset can never match
        let generation = self.generation.wrapping_add(1);

        *self = Ssp::new();
        self.generation = generation;
    }

    pub fn control0(&self) -> u16 {
        self.sscr0.0
    }

    pub fn control1(&self) -> u16 {
        self.sscr1.0
    }

    pub fn enabled(&self) -> bool {
        self.sscr0.sse()
    }

    pub fn is_transferring(&self) -> bool {
        self.transferring
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn rx_len(&self) -> u8 {
        self.rx.len()
    }

    pub fn tx_len(&self) -> u8 {
        self.tx.len()
    }

    pub fn rx_overflowed(&self) -> bool {
        self.rx.overflowed()
    }

    /// Transmit FIFO at or below its threshold
    fn tx_service_request(&self) -> bool {
        self.enabled() && self.tx.len() <= self.sscr1.tft() + 1
    }

    /// Receive FIFO at or above its threshold
    fn rx_service_request(&self) -> bool {
        self.enabled() && self.rx.len() > self.sscr1.rft()
    }

    /// Value of SSSR as seen by the guest
    pub fn status(&self) -> u16 {
        let mut status = self.sssr & 0xff00;

        status.set_bit(2, !self.tx.is_full());
        status.set_bit(3, !self.rx.is_empty());
        status.set_bit(4, self.transferring);
        status.set_bit(5, self.tx_service_request());
        status.set_bit(6, self.rx_service_request());
        status.set_bit(7, self.rx.overflowed());

        status
    }

    pub fn irq_state(&self) -> IrqState {
        let rx = self.sscr1.rie() && self.rx_service_request();
        let tx = self.sscr1.tie() && self.tx_service_request();

        IrqState::from(self.enabled() && (rx || tx || self.rx.overflowed()))
    }

    fn set_control0(&mut self, v: u16) {
        self.sscr0 = Sscr0(v);

        if !self.sscr0.sse() {
            self.rx.flush();
            self.tx.flush();

            if self.transferring {
                debug!("SSP disabled with a transfer in flight");
            }

            self.transferring = false;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    fn set_control1(&mut self, v: u16) {
        self.sscr1 = Sscr1(v & SSCR1_WRITE_MASK);
    }

    fn set_status(&mut self, v: u16) {
        self.sssr = (self.sssr & 0x00fe) | (v & 0xff00);

        if v & SSSR_ROR != 0 {
            self.rx.clear_overflow();
        }
    }

    /// Queue `v` for transmission. Returns the generation to schedule a completion event with if
    /// this starts a new transfer.
    fn queue_word(&mut self, v: u16) -> Option<u32> {
        if !self.tx.push(v) {
            debug!("SSP transmit FIFO full, dropping 0x{:04x}", v);
        }

        if self.transferring {
            None
        } else {
            self.transferring = true;
            Some(self.generation)
        }
    }

    fn read_data(&mut self) -> u16 {
        self.rx.pop()
    }
}

impl Default for Ssp {
    fn default() -> Ssp {
        Ssp::new()
    }
}

pub fn store<T: Addressable>(soc: &mut Soc, off: u32, val: T) {
    if T::width() == AccessWidth::Byte {
        debug!("SSP byte write 0x{:02x} at 0x{:x}", val.as_u8(), off);
    }

    let v = val.as_u16();

    match Register::from_u32(off) {
        Some(Register::Sscr0) => {
            let was_enabled = soc.ssp.enabled();

            soc.ssp.set_control0(v);

            if soc.ssp.enabled() && !was_enabled {
                soc.ssp_device.select();
            }
        }
        Some(Register::Sscr1) => soc.ssp.set_control1(v),
        Some(Register::Sssr) => soc.ssp.set_status(v),
        Some(Register::Ssdr) => {
            if let Some(generation) = soc.ssp.queue_word(v) {
                soc.timing.schedule(
                    SSP_TRANSFER_DELAY,
                    TimedEvent::SspTransferComplete { generation },
                );
            }
        }
        None => {
            warn!(
                "Unhandled SSP write {:?} 0x{:x} = 0x{:x}",
                T::width(),
                off,
                val.as_u32()
            );
            return;
        }
    }

    refresh_irq(soc);
}

pub fn load<T: Addressable>(soc: &mut Soc, off: u32) -> T {
    let v = match Register::from_u32(off) {
        Some(Register::Sscr0) => soc.ssp.control0(),
        Some(Register::Sscr1) => soc.ssp.control1(),
        Some(Register::Sssr) => soc.ssp.status(),
        Some(Register::Ssdr) => {
            let v = soc.ssp.read_data();
            refresh_irq(soc);
            v
        }
        None => {
            warn!("Unhandled SSP read {:?} 0x{:x}", T::width(), off);
            0
        }
    };

    T::from_u32(u32::from(v))
}

/// Called by the timing queue when the word at the head of the transmit FIFO is done shifting
pub fn transfer_complete(soc: &mut Soc, generation: u32) {
    if !soc.ssp.transferring || generation != soc.ssp.generation {
        trace!("Stale SSP completion (generation {})", generation);
        return;
    }

    let bits = soc.ssp.sscr0.dss() + 1;
    let loopback = soc.ssp.sscr1.lbm();
    let output = soc.ssp.tx.pop();
    let mut input = 0u16;

    for i in (0..bits).rev() {
        let out = output.bit(i);

        let bit = if loopback {
            out
        } else {
            soc.ssp_device.exchange_bit(out)
        };

        input = (input << 1) | u16::from(bit);
    }

    if !soc.ssp.rx.push(input) {
        warn!("SSP receive FIFO overrun, dropping 0x{:04x}", input);
    }

    if soc.ssp.tx.is_empty() {
        soc.ssp.transferring = false;
    } else {
        soc.timing.schedule(
            SSP_TRANSFER_DELAY,
            TimedEvent::SspTransferComplete { generation },
        );
    }

    refresh_irq(soc);
}

fn refresh_irq(soc: &mut Soc) {
    let state = soc.ssp.irq_state();

    irq::set_level(soc, Interrupt::Ssp, state.is_active());
}
