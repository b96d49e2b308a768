use crate::psx::addressable::Addressable;

/// Scratch Pad (data cache): 1KB
const SCRATCH_PAD_SIZE: usize = 1024;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ScratchPad {
    #[serde(with = "serde_big_array::BigArray")]
    data: [u8; SCRATCH_PAD_SIZE],
}

impl ScratchPad {
    pub fn new() -> ScratchPad {
        ScratchPad {
            data: [0; SCRATCH_PAD_SIZE],
        }
    }

    /// Fetch the little endian value at `offset`. The pad is mirrored over its mapped window so
    /// accesses wrap instead of going out of bounds.
    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let offset = offset as usize;

        let mut v = 0;

        for i in 0..T::width() as usize {
            let b = u32::from(self.data[(offset + i) & 0x3ff]);

            v |= b << (i * 8)
        }

        Addressable::from_u32(v)
    }

    /// Store the little endian value `val` at `offset`
    pub fn store<T: Addressable>(&mut self, offset: u32, val: T) {
        let offset = offset as usize;

        let val = val.as_u32();

        for i in 0..T::width() as usize {
            self.data[(offset + i) & 0x3ff] = (val >> (i * 8)) as u8;
        }
    }
}
