pub mod addressable;
pub mod bios;
pub mod bus;
pub mod gpu;
pub mod memory;
pub mod processor;

#[cfg(test)]
mod tests;
