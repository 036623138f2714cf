use thiserror::Error;

pub type PalmResult<T> = ::std::result::Result<T, PalmError>;

#[derive(Error, Debug)]
pub enum PalmError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Unknown SSP device: `{0}`")]
    UnknownSspDevice(String),
}
