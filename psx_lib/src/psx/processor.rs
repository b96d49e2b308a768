pub mod cop0;
pub mod cpu;
mod instruction;
mod opcodes;

/// Index of a general purpose CPU register
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegisterIndex(pub u8);
