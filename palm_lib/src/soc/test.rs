use super::chip_select::ChipId;
use super::cpu::DetachedCpu;
use super::irq::{Interrupt, IMR_RESET};
use super::map::REGISTER_WINDOW_BASE;
use super::test_util::soc_with_doubles;
use super::*;

fn reg(off: u32) -> u32 {
    REGISTER_WINDOW_BASE + off
}

fn supervisor() -> DetachedCpu {
    DetachedCpu::default()
}

fn user() -> DetachedCpu {
    DetachedCpu {
        user_mode: true,
        ..Default::default()
    }
}

#[test]
fn reset_values() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)), 0x1c);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(CSA)), 0x00b0);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLCR)), 0x24b3);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0x0347);
    assert_eq!(soc.load::<u32>(&mut cpu, reg(IMR)), IMR_RESET);
    assert_eq!(soc.load::<u32>(&mut cpu, reg(IPR)), 0);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(ILCR)), 0x6533);

    let rom = soc.chip_select().chip(ChipId::Rom);
    assert!(rom.enabled);
    assert!(rom.in_boot_mode);
}

#[test]
fn invalid_settings() {
    let settings = Settings {
        crystal_frequency: 0,
        ..Default::default()
    };

    assert!(Soc::new(settings).is_err());
}

#[test]
fn supervisor_only_registers() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = user();

    // SO is set out of reset
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0);
    soc.store::<u16>(&mut cpu, reg(PLLFSR), 0);

    let mut cpu = supervisor();

    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0x0347);
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)), 0x5c);

    // Writing 0 to the flag leaves it alone, writing 1 clears it
    soc.store::<u8>(&mut cpu, reg(SCR), 0x1c);
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)), 0x5c);
    soc.store::<u8>(&mut cpu, reg(SCR), 0x5c);
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)), 0x1c);

    // Drop SO, user mode can now get through
    soc.store::<u8>(&mut cpu, reg(SCR), 0x14);

    let mut cpu = user();
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0x0347);
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)), 0x14);
}

#[test]
fn register_window_double_map() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    // DMAP is set out of reset
    assert_eq!(soc.load::<u16>(&mut cpu, 0x00ff_f202), 0x0347);
    assert_eq!(soc.load::<u16>(&mut cpu, 0x12ff_f202), 0x0347);

    soc.store::<u8>(&mut cpu, reg(SCR), 0x18);

    assert_eq!(soc.load::<u16>(&mut cpu, 0x00ff_f202), 0);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0x0347);
}

#[test]
fn pll_reprogramming() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    assert_eq!(soc.clock().cycles_per_crystal_tick(), 1012.0);

    soc.store::<u16>(&mut cpu, reg(PLLFSR), 0);
    // Prescaler still on
    assert_eq!(soc.clock().cycles_per_crystal_tick(), 15.0);

    soc.store::<u16>(&mut cpu, reg(PLLCR), 0x2433);
    assert_eq!(soc.clock().cycles_per_crystal_tick(), 30.0);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLCR)), 0x2433);
    assert_eq!(cpu.timeslice_limit, None);

    // PLLCR write mask
    soc.store::<u16>(&mut cpu, reg(PLLCR), 0xc044);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLCR)), 0x0000);
}

#[test]
fn pll_frequency_protect() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    // CLK32 can't be written
    soc.store::<u16>(&mut cpu, reg(PLLFSR), 0xc123);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0x4123);

    let tick = soc.clock().cycles_per_crystal_tick();

    // Locked until reset
    soc.store::<u16>(&mut cpu, reg(PLLFSR), 0x0000);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0x4123);
    assert_eq!(soc.clock().cycles_per_crystal_tick(), tick);

    soc.reset();
    soc.store::<u16>(&mut cpu, reg(PLLFSR), 0x0000);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(PLLFSR)), 0x0000);
}

#[test]
fn pll_disable_shortens_timeslice() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    soc.store::<u16>(&mut cpu, reg(PLLCR), 0x24bb);

    assert_eq!(cpu.timeslice_limit, Some(clock::PLL_SHUTDOWN_DELAY));
}

#[test]
fn interrupt_ack() {
    let (mut soc, controller, _) = soc_with_doubles();
    let mut cpu = supervisor();

    soc.store::<u32>(
        &mut cpu,
        reg(IMR),
        IMR_RESET & !(Interrupt::Irq1.mask() | Interrupt::Int0.mask()),
    );

    irq::trigger(&mut soc, Interrupt::Irq1);
    irq::trigger(&mut soc, Interrupt::Int0);
    // Masked, pending but not active
    irq::trigger(&mut soc, Interrupt::Rtc);

    assert_eq!(
        controller.take(),
        vec![(Interrupt::Irq1, true), (Interrupt::Int0, true)]
    );

    let active = Interrupt::Irq1.mask() | Interrupt::Int0.mask();
    assert_eq!(soc.load::<u32>(&mut cpu, reg(ISR)), active);
    assert_eq!(
        soc.load::<u32>(&mut cpu, reg(IPR)),
        active | Interrupt::Rtc.mask()
    );

    // Byte ack of bits 23:16 only touches IRQ1
    soc.store::<u8>(&mut cpu, reg(ISR + 1), 0x01);

    assert_eq!(soc.load::<u32>(&mut cpu, reg(ISR)), Interrupt::Int0.mask());
    assert_eq!(controller.take(), vec![(Interrupt::Irq1, false)]);

    soc.store::<u32>(&mut cpu, reg(ISR), 0xffff_ffff);
    assert_eq!(soc.load::<u32>(&mut cpu, reg(ISR)), 0);
    assert_eq!(soc.load::<u32>(&mut cpu, reg(IPR)), 0);

    // IPR is read-only
    irq::trigger(&mut soc, Interrupt::Rtc);
    soc.store::<u32>(&mut cpu, reg(IPR), 0);
    assert_eq!(soc.load::<u32>(&mut cpu, reg(IPR)), Interrupt::Rtc.mask());
}

#[test]
fn narrow_and_wide_register_writes() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    // Low byte of IMR
    soc.store::<u8>(&mut cpu, reg(IMR + 3), 0x00);
    assert_eq!(soc.load::<u32>(&mut cpu, reg(IMR)), 0x00ff_ff00);

    // One word write spanning CSGBA and CSGBB
    soc.store::<u32>(&mut cpu, reg(CSGBA), 0x1000_2000);

    assert_eq!(soc.load::<u16>(&mut cpu, reg(CSGBA)), 0x1000);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(CSGBB)), 0x2000);
    assert_eq!(soc.chip_select().chip(ChipId::Rom).start, 0x0200_0000);
    assert_eq!(soc.chip_select().chip(ChipId::Sed).start, 0x0400_0000);

    soc.store::<u16>(&mut cpu, reg(ILCR), 0x0271);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(ILCR)), 0x6231);
}

#[test]
fn wide_access_wraps_at_window_end() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    // Bytes 0xffe and 0xfff are unimplemented, the last two wrap around to SCR
    soc.store::<u32>(&mut cpu, reg(0xffe), 0x0000_1800);

    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)), 0x18);
    assert_eq!(soc.load::<u32>(&mut cpu, reg(0xffe)), 0x0000_1800);
}

#[test]
fn unimplemented_registers() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    soc.store::<u16>(&mut cpu, reg(0x400), 0x1234);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(0x400)), 0);

    // Stored verbatim
    soc.store::<u16>(&mut cpu, reg(CSCTRL2), 0xabcd);
    assert_eq!(soc.load::<u16>(&mut cpu, reg(CSCTRL2)), 0xabcd);

    assert_eq!(soc.load::<u32>(&mut cpu, 0x1234_5678), 0);
    soc.store::<u32>(&mut cpu, 0x1234_5678, 0);
}

#[test]
fn ssp_routing() {
    let (mut soc, _, device) = soc_with_doubles();
    let mut cpu = supervisor();

    soc.store::<u32>(&mut cpu, map::SSP.0, 0x87);
    assert_eq!(soc.ssp().control0(), 0x87);

    device.reply(0x3c, 8);
    soc.store::<u32>(&mut cpu, map::SSP.0 + 0x10, 0x5a);

    soc.run(ssp::SSP_TRANSFER_DELAY);

    assert_eq!(device.sent_words(8), vec![0x5a]);
    assert_eq!(soc.load::<u32>(&mut cpu, map::SSP.0 + 0x10), 0x3c);
}

#[test]
fn reset_drops_lines_and_events() {
    let (mut soc, controller, _) = soc_with_doubles();
    let mut cpu = supervisor();

    soc.store::<u32>(&mut cpu, reg(IMR), 0);
    irq::trigger(&mut soc, Interrupt::Timer1);

    soc.store::<u32>(&mut cpu, map::SSP.0, 0x87);
    soc.store::<u32>(&mut cpu, map::SSP.0 + 0x10, 0x5a);
    assert_eq!(soc.timing().len(), 1);

    controller.take();
    soc.reset();

    assert_eq!(controller.take(), vec![(Interrupt::Timer1, false)]);
    assert!(soc.timing().is_empty());
    assert!(!soc.ssp().is_transferring());
    assert_eq!(soc.now(), 0);
}

#[test]
fn chip_protection() {
    let (mut soc, _, _) = soc_with_doubles();
    let mut cpu = supervisor();

    // Boot mode: the ROM answers everywhere
    let m = soc.map_access(&cpu, 0x0402_0010, AccessKind::Read);
    assert_eq!(m.map(|m| m.chip), Some(ChipId::Rom));

    // ROM at 0, 128KiB. Leaves boot mode.
    soc.store::<u16>(&mut cpu, reg(CSA), 0x0001);
    assert!(!soc.chip_select().chip(ChipId::Rom).in_boot_mode);

    // SED at 0x0400_0000, 64KiB, supervisor-only above the first 32KiB
    soc.store::<u16>(&mut cpu, reg(CSGBB), 0x2000);
    soc.store::<u16>(&mut cpu, reg(CSB), 0x4003);

    // RAM at 0x0800_0000, read-only
    soc.store::<u16>(&mut cpu, reg(CSGBD), 0x4000);
    soc.store::<u16>(&mut cpu, reg(CSD), 0x8001);

    let user = user();

    assert_eq!(
        soc.map_access(&cpu, 0x0400_8000, AccessKind::Read),
        Some(ChipMapping {
            chip: ChipId::Sed,
            offset: 0x8000
        })
    );
    assert!(soc.map_access(&user, 0x0400_0100, AccessKind::Write).is_some());
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)) & 0xe0, 0);

    assert!(soc.map_access(&user, 0x0400_8000, AccessKind::Read).is_none());
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)) & 0xe0, 0x40);

    assert!(soc.map_access(&cpu, 0x0800_0000, AccessKind::Read).is_some());
    assert!(soc.map_access(&cpu, 0x0800_0000, AccessKind::Write).is_none());
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)) & 0xe0, 0x60);

    // Nothing there, BETEN is set out of reset
    assert!(soc.map_access(&cpu, 0x2000_0000, AccessKind::Read).is_none());
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)) & 0xe0, 0xe0);

    soc.store::<u8>(&mut cpu, reg(SCR), 0xfc);
    assert_eq!(soc.load::<u8>(&mut cpu, reg(SCR)), 0x1c);
}
