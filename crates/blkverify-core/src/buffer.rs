//! Block-aligned chunk buffers.
//!
//! Direct I/O requires the user buffer to be aligned to the device's
//! physical block size, which a `Vec` cannot guarantee.

use crate::word::Word;
use crate::{Error, Result};
use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// A zero-initialised, block-aligned buffer of pattern words.
pub struct ChunkBuffer<W: Word> {
    ptr: NonNull<W>,
    layout: Layout,
    words: usize,
    _marker: PhantomData<W>,
}

// The buffer exclusively owns its allocation.
unsafe impl<W: Word> Send for ChunkBuffer<W> {}

impl<W: Word> ChunkBuffer<W> {
    /// Allocate `bytes` bytes aligned to `block_size` (or to the word
    /// alignment, whichever is larger).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alloc`] if `bytes` is zero or not a whole number of
    /// words, if the alignment is not a power of two, or if the allocator
    /// fails.
    pub fn new(bytes: usize, block_size: usize) -> Result<Self> {
        let align = block_size.max(std::mem::align_of::<W>());
        let alloc_err = Error::Alloc { bytes, align };

        if bytes == 0 || bytes % W::BYTES != 0 {
            return Err(alloc_err);
        }
        let layout = Layout::from_size_align(bytes, align).map_err(|_| Error::Alloc { bytes, align })?;

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<W>()).ok_or(alloc_err)?;

        Ok(Self {
            ptr,
            layout,
            words: bytes / W::BYTES,
            _marker: PhantomData,
        })
    }

    /// Number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words
    }

    /// Always false; zero-sized buffers cannot be allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    /// Size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of the allocation.
    #[must_use]
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    /// Word view.
    #[must_use]
    pub fn words(&self) -> &[W] {
        // SAFETY: ptr is valid for `words` initialised elements of W.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.words) }
    }

    /// Mutable word view.
    pub fn words_mut(&mut self) -> &mut [W] {
        // SAFETY: as above, and &mut self guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.words) }
    }

    /// Byte view, in native word byte order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: W is a plain unsigned integer; every byte is initialised.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u8>(), self.layout.size()) }
    }

    /// Mutable byte view. Any byte pattern is a valid W.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<u8>(), self.layout.size()) }
    }

    /// Overwrite every word with its [`Word::poison`] sentinel.
    pub fn poison(&mut self) {
        for (i, w) in self.words_mut().iter_mut().enumerate() {
            *w = W::poison(i);
        }
    }
}

impl<W: Word> Drop for ChunkBuffer<W> {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) };
    }
}

impl<W: Word> std::fmt::Debug for ChunkBuffer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkBuffer")
            .field("bytes", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}
