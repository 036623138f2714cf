//! Palm handheld SoC peripheral core
//!
//! Register bus, chip selects, PLL, interrupt aggregation and the synchronous serial port of a
//! DragonBall-class SoC. The CPU core is an external collaborator that drives everything through
//! `Soc::load`, `Soc::store` and `Soc::run`.

// Register widths are fixed by the hardware, truncating `as` casts between them are intentional
#![allow(clippy::cast_lossless)]

#[macro_use]
extern crate log;

mod bitwise;
pub mod error;
pub mod settings;
pub mod soc;

pub use error::{PalmError, PalmResult};
pub use settings::{Settings, SspDeviceKind};
pub use soc::addressable::{AccessWidth, Addressable};
pub use soc::cpu::{CpuControl, DetachedCpu};
pub use soc::irq::{Interrupt, InterruptController};
pub use soc::ssp::WiredDevice;
pub use soc::system_control::AccessKind;
pub use soc::{CycleCount, Soc};
