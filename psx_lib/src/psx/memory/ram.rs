use crate::box_array::BoxArray;
use crate::psx::addressable::Addressable;

/// System RAM: 2MB
pub const RAM_SIZE: usize = 2 * 1024 * 1024;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Ram {
    data: BoxArray<u8, RAM_SIZE>,
}

impl Ram {
    pub fn new() -> Ram {
        Ram {
            data: BoxArray::from_vec(vec![0; RAM_SIZE]),
        }
    }

    /// Fetch the little endian value at `offset`
    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let offset = (offset & 0x1f_ffff) as usize;

        let mut v = 0;

        for i in 0..T::width() as usize {
            let b = u32::from(self.data[offset + i]);

            v |= b << (i * 8)
        }

        Addressable::from_u32(v)
    }

    /// Store the little endian value `val` at `offset`
    pub fn store<T: Addressable>(&mut self, offset: u32, val: T) {
        let offset = (offset & 0x1f_ffff) as usize;

        let val = val.as_u32();

        for i in 0..T::width() as usize {
            self.data[offset + i] = (val >> (i * 8)) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_widths() {
        let mut ram = Ram::new();

        ram.store::<u32>(0x1000, 0xdead_beef);
        assert_eq!(ram.load::<u32>(0x1000), 0xdead_beef);

        ram.store::<u16>(0x1000, 0xcafe);
        assert_eq!(ram.load::<u16>(0x1000), 0xcafe);
        // Upper halfword untouched
        assert_eq!(ram.load::<u32>(0x1000), 0xdead_cafe);

        ram.store::<u8>(0x1003, 0x42);
        assert_eq!(ram.load::<u8>(0x1003), 0x42);
        assert_eq!(ram.load::<u32>(0x1000), 0x42ad_cafe);
    }

    #[test]
    fn little_endian_layout() {
        let mut ram = Ram::new();

        ram.store::<u32>(0x0, 0x0403_0201);

        for i in 0..4 {
            assert_eq!(ram.load::<u8>(i), i as u8 + 1);
        }
    }
}
