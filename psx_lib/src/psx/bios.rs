use crate::box_array::BoxArray;
use crate::error::{PsxError, Result};
use crate::psx::addressable::Addressable;

/// BIOS image: 512KB
pub const BIOS_SIZE: usize = 512 * 1024;

pub struct Bios {
    rom: BoxArray<u8, BIOS_SIZE>,
}

impl Bios {
    /// Create a BIOS image from `blob`. The blob must be exactly `BIOS_SIZE` bytes long,
    /// anything else is a fatal initialization error.
    pub fn new(blob: &[u8]) -> Result<Bios> {
        if blob.len() != BIOS_SIZE {
            return Err(PsxError::BadBios {
                expected: BIOS_SIZE,
                got: blob.len(),
            });
        }

        Ok(Bios {
            rom: BoxArray::from_vec(blob.to_vec()),
        })
    }

    /// Fetch the little endian value at `offset`
    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let offset = offset as usize;

        let mut v = 0;

        for i in 0..T::width() as usize {
            let b = u32::from(self.rom[offset + i]);

            v |= b << (i * 8)
        }

        Addressable::from_u32(v)
    }
}
