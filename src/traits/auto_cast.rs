// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Traits for reading and writing big-endian words out of byte memory.
//!
//! Users of this module should impl [Grab] for their type, which notably returns `&[u8]` and `&mut [u8]`

use crate::error::{Error, Result};
use std::slice::SliceIndex;

/// Gets a `&[u8]` at [SliceIndex] `I`.
///
/// This is similar to the [SliceIndex] method `.get(...)`, however implementing this trait
/// will auto-impl [AutoCast]<([u8], [u16])>
pub trait Grab {
    /// Gets the slice of Self at [SliceIndex] I
    fn grab<I>(&self, index: I) -> Option<&<I as SliceIndex<[u8]>>::Output>
    where
        I: SliceIndex<[u8]>;

    /// Gets a mutable slice of Self at [SliceIndex] I
    fn grab_mut<I>(&mut self, index: I) -> Option<&mut <I as SliceIndex<[u8]>>::Output>
    where
        I: SliceIndex<[u8]>;
}

/// Read or Write a T at address `addr`, quietly yielding the default on failure
pub trait AutoCast<T>: FallibleAutoCast<T> {
    /// Reads a T from address `addr`
    fn read(&self, addr: impl Into<usize>) -> T;
    /// Write a T to address `addr`
    fn write(&mut self, addr: impl Into<usize>, data: T);
}

/// Read a T from address `addr`, and return the value as a [Result]
pub trait FallibleAutoCast<T>: Grab {
    /// Read a T from address `addr`, returning the value as a [Result]
    fn read_fallible(&self, addr: impl Into<usize>) -> Result<T>;
    /// Write a T to address `addr`, returning the value as a [Result]
    fn write_fallible(&mut self, addr: impl Into<usize>, data: T) -> Result<()>;
}

/// Implements Read and Write for the provided types
///
/// Relies on inherent methods of Rust numeric types:
/// - `Self::from_be_bytes`
/// - `Self::to_be_bytes`
macro_rules! impl_rw {($($t:ty) ,* $(,)?) =>{
    $(
        #[doc = concat!("Read or Write [", stringify!($t), "] at address `addr`")]
        impl<T: Grab> AutoCast<$t> for T {
            #[inline(always)]
            fn read(&self, addr: impl Into<usize>) -> $t {
                self.read_fallible(addr).ok().unwrap_or_default()
            }
            #[inline(always)]
            fn write(&mut self, addr: impl Into<usize>, data: $t) {
                self.write_fallible(addr, data).ok();
            }
        }
        impl<T: Grab> FallibleAutoCast<$t> for T {
            #[inline(always)]
            fn read_fallible(&self, addr: impl Into<usize>) -> Result<$t> {
                let addr: usize = addr.into();
                let len = core::mem::size_of::<$t>();
                let bytes: Option<[u8; core::mem::size_of::<$t>()]> =
                    self.grab(addr..addr + len).and_then(|bytes| bytes.try_into().ok());
                match bytes {
                    // Chip-8 is a big-endian system
                    Some(bytes) => Ok(<$t>::from_be_bytes(bytes)),
                    None => Err(Error::InvalidAddressRange { addr, len }),
                }
            }
            #[inline(always)]
            fn write_fallible(&mut self, addr: impl Into<usize>, data: $t) -> Result<()> {
                let addr: usize = addr.into();
                let len = core::mem::size_of::<$t>();
                let slice = self
                    .grab_mut(addr..addr + len)
                    .ok_or(Error::InvalidAddressRange { addr, len })?;
                // Chip-8 is a big-endian system
                slice.copy_from_slice(&data.to_be_bytes());
                Ok(())
            }
        }
    )*
}}

impl_rw!(u8, u16);
