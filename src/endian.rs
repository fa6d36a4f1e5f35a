//! Little endian field codec over raw byte buffers.
//!
//! Every on-disk and hardware layout in this crate is described as
//! (offset, width) pairs and decoded through these helpers, so nothing
//! depends on struct layout or alignment.

pub(crate) trait Little: Copy + Sized {
    const WIDTH: usize;

    fn decode(bytes: &[u8], offset: usize) -> Self;
    fn encode(self, bytes: &mut [u8], offset: usize);
}

macro_rules! define {
    ($type:ty) => {
        impl Little for $type {
            const WIDTH: usize = core::mem::size_of::<$type>();

            #[inline]
            fn decode(bytes: &[u8], offset: usize) -> Self {
                let mut array = [0u8; core::mem::size_of::<$type>()];
                array.copy_from_slice(&bytes[offset..offset + Self::WIDTH]);
                <$type>::from_le_bytes(array)
            }

            #[inline]
            fn encode(self, bytes: &mut [u8], offset: usize) {
                bytes[offset..offset + Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

define!(u8);
define!(u16);
define!(u32);
define!(u64);

/// Read a little endian field at `offset`
#[inline]
pub(crate) fn le<T: Little>(bytes: &[u8], offset: usize) -> T {
    T::decode(bytes, offset)
}

/// Write a little endian field at `offset`
#[inline]
pub(crate) fn put_le<T: Little>(bytes: &mut [u8], offset: usize, value: T) {
    value.encode(bytes, offset)
}
