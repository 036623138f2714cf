use super::CycleCount;

/// Interface the CPU core exposes to the peripherals. The CPU core itself is not part of this
/// crate: it drives us through `Soc::load`, `Soc::store` and `Soc::run`.
pub trait CpuControl {
    /// True if the access currently in flight is made in supervisor mode
    fn supervisor(&self) -> bool {
        true
    }

    /// End the current execution timeslice `cycles` cycles from now
    fn shorten_timeslice(&mut self, cycles: CycleCount);
}

/// Stand-in used when the caller has no CPU to notify, for instance when replaying register
/// traces. Timeslice requests are remembered so that they can be inspected.
#[derive(Debug, Default)]
pub struct DetachedCpu {
    pub user_mode: bool,
    pub timeslice_limit: Option<CycleCount>,
}

impl CpuControl for DetachedCpu {
    fn supervisor(&self) -> bool {
        !self.user_mode
    }

    fn shorten_timeslice(&mut self, cycles: CycleCount) {
        self.timeslice_limit = Some(cycles);
    }
}
