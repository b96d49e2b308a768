use std::io;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, PsxError>;

#[derive(Error, Debug)]
pub enum PsxError {
    #[error("Input output error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid BIOS image: expected {expected} bytes, got {got}")]
    BadBios { expected: usize, got: usize },
    #[error("Access to unmapped address 0x{addr:08x}")]
    OutOfRange { addr: u32 },
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
