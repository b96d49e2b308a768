use std::io;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Usage: psx_app <bios-image> [run-seconds]")]
    BadUsage,
    #[error("Input output error: {0}")]
    IoError(#[from] io::Error),
    #[error("Machine error: {0}")]
    Machine(#[from] psx_lib::PsxError),
}
