use std::fs;
use std::path::Path;

use palm_lib::{
    AccessWidth, DetachedCpu, Interrupt, InterruptController, Settings, Soc,
};
use tracing::{debug, info};

use crate::config;
use crate::error::{AppError, Result};
use crate::script::{self, Command, Line};

/// Logs the interrupt lines going up and down
struct TraceController;

impl InterruptController for TraceController {
    fn raise_interrupt_line(&mut self, source: Interrupt, asserted: bool) {
        info!(
            "Interrupt {:?} {}",
            source,
            if asserted { "asserted" } else { "cleared" }
        );
    }
}

pub struct App {
    soc: Soc,
    cpu: DetachedCpu,
}

impl App {
    /// Entry point: `args` are the command line arguments minus the program name
    pub fn start<I: Iterator<Item = String>>(mut args: I) -> Result<()> {
        let (Some(settings_path), Some(script_path)) = (args.next(), args.next()) else {
            return Err(AppError::Usage);
        };

        let settings = config::load(Path::new(&settings_path))?;

        let source = fs::read_to_string(&script_path)?;
        let lines = script::parse(&source)?;

        info!("Running {} commands from {}", lines.len(), script_path);

        let mut app = App::new(settings)?;
        app.run_script(&lines)?;

        info!("Script done, {} cycles elapsed", app.soc.now());

        Ok(())
    }

    pub fn new(settings: Settings) -> Result<App> {
        let mut soc = Soc::new(settings)?;

        soc.connect_interrupt_controller(Box::new(TraceController));

        Ok(App {
            soc,
            cpu: DetachedCpu::default(),
        })
    }

    pub fn run_script(&mut self, lines: &[Line]) -> Result<()> {
        for line in lines {
            self.execute(line)?;
        }

        Ok(())
    }

    fn execute(&mut self, line: &Line) -> Result<()> {
        let cpu = &mut self.cpu;

        match line.command {
            Command::Write { width, addr, value } => {
                debug!("{}: write {:?} 0x{:08x} = 0x{:x}", line.number, width, addr, value);

                match width {
                    AccessWidth::Byte => self.soc.store(cpu, addr, value as u8),
                    AccessWidth::HalfWord => self.soc.store(cpu, addr, value as u16),
                    AccessWidth::Word => self.soc.store(cpu, addr, value),
                }
            }
            Command::Read {
                width,
                addr,
                expected,
            } => {
                let got = match width {
                    AccessWidth::Byte => u32::from(self.soc.load::<u8>(cpu, addr)),
                    AccessWidth::HalfWord => u32::from(self.soc.load::<u16>(cpu, addr)),
                    AccessWidth::Word => self.soc.load::<u32>(cpu, addr),
                };

                info!("{}: read {:?} 0x{:08x} = 0x{:x}", line.number, width, addr, got);

                if let Some(expected) = expected {
                    if expected != got {
                        return Err(AppError::Mismatch {
                            line: line.number,
                            addr,
                            expected,
                            got,
                        });
                    }
                }
            }
            Command::Run(cycles) => self.soc.run(cycles),
            Command::Privilege { supervisor } => cpu.user_mode = !supervisor,
        }

        if let Some(cycles) = cpu.timeslice_limit.take() {
            info!("{}: CPU timeslice cut to {} cycles", line.number, cycles);
        }

        Ok(())
    }
}

#[test]
fn ssp_loopback_script() {
    let settings = Settings {
        ssp_device: palm_lib::SspDeviceKind::Loopback,
        ..Default::default()
    };

    let mut app = App::new(settings).unwrap();

    let lines = script::parse(
        "\
# 8bit words, port enabled
w32 0x41000000 0x87
w32 0x41000010 0x5a
r32 0x41000008 0xf034
run 10
r32 0x41000008 0xf06c
r32 0x41000010 0x5a
",
    )
    .unwrap();

    app.run_script(&lines).unwrap();
    assert_eq!(app.soc.now(), 10);
}

#[test]
fn script_mismatch() {
    let mut app = App::new(Settings::default()).unwrap();

    let lines = script::parse("r16 0xfffff202 0x0347\nr16 0xfffff200 0x1234\n").unwrap();

    match app.run_script(&lines) {
        Err(AppError::Mismatch {
            line, expected, got, ..
        }) => {
            assert_eq!(line, 2);
            assert_eq!(expected, 0x1234);
            assert_eq!(got, 0x24b3);
        }
        r => panic!("Unexpected result {:?}", r),
    }
}

#[test]
fn user_mode_script() {
    let mut app = App::new(Settings::default()).unwrap();

    let lines = script::parse(
        "\
user
r16 0xfffff202 0
supervisor
r8 0xfffff000 0x5c
w16 0xfffff200 0x24bb
",
    )
    .unwrap();

    app.run_script(&lines).unwrap();

    // The timeslice request was reported and consumed
    assert_eq!(app.cpu.timeslice_limit, None);
}
