use palm_lib::PalmError;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Usage: palm_app <settings.ini> <script>")]
    Usage,
    #[error("Failed to load settings: {0}")]
    Config(#[from] ini::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Palm(#[from] PalmError),
    #[error("Script line {line}: {msg}")]
    Script { line: usize, msg: String },
    #[error("Script line {line}: read 0x{got:x} at 0x{addr:08x}, expected 0x{expected:x}")]
    Mismatch {
        line: usize,
        addr: u32,
        expected: u32,
        got: u32,
    },
}
