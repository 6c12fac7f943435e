//! RAII Wrappers
//!
//! Owned native contexts, dictionaries and streams. Each wrapper holds a
//! [`Zstd`] clone, so the library outlives every object created from it, and
//! frees its native object on drop.

use std::marker::PhantomData;
use std::ptr::NonNull;

use tracing::trace;

use super::types::{
    CCtx, CDict, CParameter, CStream, DCtx, DDict, DParameter, DStream, EndDirective, ErrorCode,
    InBuffer, OutBuffer, ResetDirective, BLOCK_SIZE_MAX, ZSTD_CONTENTSIZE_ERROR,
    ZSTD_CONTENTSIZE_UNKNOWN,
};
use super::{Zstd, ZstdError, ZstdResult};

fn allocated<T>(ptr: *mut T, what: &'static str) -> ZstdResult<NonNull<T>> {
    NonNull::new(ptr).ok_or(ZstdError::Allocation(what))
}

/// Progress of one streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamProgress {
    /// Input bytes consumed
    pub consumed: usize,
    /// Output bytes produced
    pub written: usize,
    /// The native hint: bytes still to flush when compressing, 0 once a
    /// frame is fully decoded when decompressing
    pub remaining: usize,
}

/// Owned `ZSTD_CCtx`.
pub struct CompressionContext {
    zstd: Zstd,
    ptr: NonNull<CCtx>,
}

// Safety: a context may move between threads as long as it is used by one
// thread at a time, which `&mut self` enforces.
unsafe impl Send for CompressionContext {}

impl CompressionContext {
    pub fn new(zstd: &Zstd) -> ZstdResult<Self> {
        let ptr = allocated(unsafe { (zstd.ZSTD_createCCtx)() }, "compression context")?;
        Ok(Self {
            zstd: zstd.clone(),
            ptr,
        })
    }

    pub fn as_ptr(&self) -> *mut CCtx {
        self.ptr.as_ptr()
    }

    /// Compress `src` into `dst` at `level`. Returns the compressed size.
    pub fn compress(&mut self, dst: &mut [u8], src: &[u8], level: i32) -> ZstdResult<usize> {
        let result = unsafe { self.zstd.compress_cctx(self.as_ptr(), dst, src, level) };
        self.zstd.check(result)
    }

    pub fn compress_to_vec(&mut self, src: &[u8], level: i32) -> ZstdResult<Vec<u8>> {
        let mut dst = vec![0u8; self.zstd.compress_bound(src.len())];
        let written = self.compress(&mut dst, src, level)?;
        dst.truncate(written);
        Ok(dst)
    }

    /// Compress with the parameters set through [`Self::set_parameter`].
    pub fn compress2(&mut self, dst: &mut [u8], src: &[u8]) -> ZstdResult<usize> {
        let result = unsafe { self.zstd.compress2(self.as_ptr(), dst, src) };
        self.zstd.check(result)
    }

    pub fn compress_with_dictionary(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        dictionary: &CompressionDictionary,
    ) -> ZstdResult<usize> {
        let result = unsafe {
            self.zstd
                .compress_using_cdict(self.as_ptr(), dst, src, dictionary.as_ptr())
        };
        self.zstd.check(result)
    }

    pub fn set_parameter(&mut self, param: CParameter, value: i32) -> ZstdResult<()> {
        let result = unsafe { (self.zstd.ZSTD_CCtx_setParameter)(self.as_ptr(), param, value) };
        self.zstd.check(result).map(|_| ())
    }

    pub fn reset(&mut self, directive: ResetDirective) -> ZstdResult<()> {
        let result = unsafe { (self.zstd.ZSTD_CCtx_reset)(self.as_ptr(), directive) };
        self.zstd.check(result).map(|_| ())
    }
}

impl Drop for CompressionContext {
    fn drop(&mut self) {
        unsafe {
            (self.zstd.ZSTD_freeCCtx)(self.ptr.as_ptr());
        }
    }
}

/// Owned `ZSTD_DCtx`.
pub struct DecompressionContext {
    zstd: Zstd,
    ptr: NonNull<DCtx>,
}

// Safety: see `CompressionContext`.
unsafe impl Send for DecompressionContext {}

impl DecompressionContext {
    pub fn new(zstd: &Zstd) -> ZstdResult<Self> {
        let ptr = allocated(unsafe { (zstd.ZSTD_createDCtx)() }, "decompression context")?;
        Ok(Self {
            zstd: zstd.clone(),
            ptr,
        })
    }

    pub fn as_ptr(&self) -> *mut DCtx {
        self.ptr.as_ptr()
    }

    /// Decompress `src` into `dst`. Returns the decompressed size.
    pub fn decompress(&mut self, dst: &mut [u8], src: &[u8]) -> ZstdResult<usize> {
        let result = unsafe { self.zstd.decompress_dctx(self.as_ptr(), dst, src) };
        self.zstd.check(result)
    }

    /// Decompress a single frame whose header records the content size.
    ///
    /// The buffer is sized from the first frame only, so input holding
    /// several concatenated frames fails with `DstSizeTooSmall`; use
    /// [`DecompressionStream::decompress_all`] for those.
    pub fn decompress_to_vec(&mut self, src: &[u8]) -> ZstdResult<Vec<u8>> {
        let size = self.content_size(src)?;
        let mut dst = Vec::new();
        dst.try_reserve_exact(size)
            .map_err(|_| ZstdError::ContentSizeTooLarge(size as u64))?;
        dst.resize(size, 0);
        let written = self.decompress(&mut dst, src)?;
        dst.truncate(written);
        Ok(dst)
    }

    pub fn decompress_with_dictionary(
        &mut self,
        dst: &mut [u8],
        src: &[u8],
        dictionary: &DecompressionDictionary,
    ) -> ZstdResult<usize> {
        let result = unsafe {
            self.zstd
                .decompress_using_ddict(self.as_ptr(), dst, src, dictionary.as_ptr())
        };
        self.zstd.check(result)
    }

    pub fn set_parameter(&mut self, param: DParameter, value: i32) -> ZstdResult<()> {
        let result = unsafe { (self.zstd.ZSTD_DCtx_setParameter)(self.as_ptr(), param, value) };
        self.zstd.check(result).map(|_| ())
    }

    pub fn reset(&mut self, directive: ResetDirective) -> ZstdResult<()> {
        let result = unsafe { (self.zstd.ZSTD_DCtx_reset)(self.as_ptr(), directive) };
        self.zstd.check(result).map(|_| ())
    }

    fn content_size(&self, src: &[u8]) -> ZstdResult<usize> {
        match self.zstd.frame_content_size(src) {
            ZSTD_CONTENTSIZE_UNKNOWN => Err(ZstdError::ContentSizeUnknown),
            ZSTD_CONTENTSIZE_ERROR => Err(ZstdError::ContentSizeError),
            // Every block of up to BLOCK_SIZE_MAX bytes costs at least one input byte
            size if size > (src.len() as u64).saturating_mul(BLOCK_SIZE_MAX as u64) => {
                Err(ZstdError::ContentSizeTooLarge(size))
            }
            size => usize::try_from(size).map_err(|_| ZstdError::ContentSizeTooLarge(size)),
        }
    }
}

impl Drop for DecompressionContext {
    fn drop(&mut self) {
        unsafe {
            (self.zstd.ZSTD_freeDCtx)(self.ptr.as_ptr());
        }
    }
}

/// Digested compression dictionary. The dictionary bytes are copied.
pub struct CompressionDictionary {
    zstd: Zstd,
    ptr: NonNull<CDict>,
}

// Safety: a digested dictionary is read-only once created.
unsafe impl Send for CompressionDictionary {}
unsafe impl Sync for CompressionDictionary {}

impl CompressionDictionary {
    pub fn new(zstd: &Zstd, dictionary: &[u8], level: i32) -> ZstdResult<Self> {
        let raw = unsafe {
            (zstd.ZSTD_createCDict)(dictionary.as_ptr().cast(), dictionary.len(), level)
        };
        let ptr = allocated(raw, "compression dictionary")?;
        Ok(Self {
            zstd: zstd.clone(),
            ptr,
        })
    }

    pub fn as_ptr(&self) -> *const CDict {
        self.ptr.as_ptr()
    }
}

impl Drop for CompressionDictionary {
    fn drop(&mut self) {
        unsafe {
            (self.zstd.ZSTD_freeCDict)(self.ptr.as_ptr());
        }
    }
}

/// Digested decompression dictionary. The dictionary bytes are copied.
pub struct DecompressionDictionary {
    zstd: Zstd,
    ptr: NonNull<DDict>,
}

// Safety: see `CompressionDictionary`.
unsafe impl Send for DecompressionDictionary {}
unsafe impl Sync for DecompressionDictionary {}

impl DecompressionDictionary {
    pub fn new(zstd: &Zstd, dictionary: &[u8]) -> ZstdResult<Self> {
        let raw = unsafe { (zstd.ZSTD_createDDict)(dictionary.as_ptr().cast(), dictionary.len()) };
        let ptr = allocated(raw, "decompression dictionary")?;
        Ok(Self {
            zstd: zstd.clone(),
            ptr,
        })
    }

    pub fn as_ptr(&self) -> *const DDict {
        self.ptr.as_ptr()
    }
}

impl Drop for DecompressionDictionary {
    fn drop(&mut self) {
        unsafe {
            (self.zstd.ZSTD_freeDDict)(self.ptr.as_ptr());
        }
    }
}

/// Streaming compressor. Borrows its dictionary, if any, for `'d`.
pub struct CompressionStream<'d> {
    zstd: Zstd,
    ptr: NonNull<CStream>,
    _dictionary: PhantomData<&'d CompressionDictionary>,
}

// Safety: see `CompressionContext`.
unsafe impl Send for CompressionStream<'_> {}

impl CompressionStream<'static> {
    pub fn new(zstd: &Zstd, level: i32) -> ZstdResult<Self> {
        let stream = Self::create(zstd)?;
        let result = unsafe { (zstd.ZSTD_initCStream)(stream.ptr.as_ptr(), level) };
        zstd.check(result)?;
        Ok(stream)
    }
}

impl<'d> CompressionStream<'d> {
    pub fn with_dictionary(zstd: &Zstd, dictionary: &'d CompressionDictionary) -> ZstdResult<Self> {
        let stream = Self::create(zstd)?;
        let result =
            unsafe { (zstd.ZSTD_initCStream_usingCDict)(stream.ptr.as_ptr(), dictionary.as_ptr()) };
        zstd.check(result)?;
        Ok(stream)
    }

    fn create(zstd: &Zstd) -> ZstdResult<Self> {
        let ptr = allocated(unsafe { (zstd.ZSTD_createCStream)() }, "compression stream")?;
        Ok(Self {
            zstd: zstd.clone(),
            ptr,
            _dictionary: PhantomData,
        })
    }

    pub fn as_ptr(&self) -> *mut CStream {
        self.ptr.as_ptr()
    }

    /// One `ZSTD_compressStream2` call.
    pub fn compress_chunk(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        directive: EndDirective,
    ) -> ZstdResult<StreamProgress> {
        let mut in_buffer = InBuffer::new(input);
        let mut out_buffer = OutBuffer::new(output);
        let result = unsafe {
            (self.zstd.ZSTD_compressStream2)(
                self.as_ptr(),
                &mut out_buffer,
                &mut in_buffer,
                directive,
            )
        };
        let remaining = self.zstd.check(result)?;
        Ok(StreamProgress {
            consumed: in_buffer.pos,
            written: out_buffer.pos,
            remaining,
        })
    }

    /// One `ZSTD_compressStream` call; `remaining` is the next input size hint.
    pub fn write(&mut self, input: &[u8], output: &mut [u8]) -> ZstdResult<StreamProgress> {
        let mut in_buffer = InBuffer::new(input);
        let mut out_buffer = OutBuffer::new(output);
        let result = unsafe {
            (self.zstd.ZSTD_compressStream)(self.as_ptr(), &mut out_buffer, &mut in_buffer)
        };
        let remaining = self.zstd.check(result)?;
        Ok(StreamProgress {
            consumed: in_buffer.pos,
            written: out_buffer.pos,
            remaining,
        })
    }

    /// Flush buffered data as complete blocks.
    pub fn flush(&mut self, output: &mut [u8]) -> ZstdResult<StreamProgress> {
        let mut out_buffer = OutBuffer::new(output);
        let result = unsafe { (self.zstd.ZSTD_flushStream)(self.as_ptr(), &mut out_buffer) };
        let remaining = self.zstd.check(result)?;
        Ok(StreamProgress {
            consumed: 0,
            written: out_buffer.pos,
            remaining,
        })
    }

    /// Flush and write the frame epilogue. Call until `remaining` is 0.
    pub fn finish(&mut self, output: &mut [u8]) -> ZstdResult<StreamProgress> {
        let mut out_buffer = OutBuffer::new(output);
        let result = unsafe { (self.zstd.ZSTD_endStream)(self.as_ptr(), &mut out_buffer) };
        let remaining = self.zstd.check(result)?;
        Ok(StreamProgress {
            consumed: 0,
            written: out_buffer.pos,
            remaining,
        })
    }

    /// Compress `input` into one complete frame.
    pub fn compress_all(&mut self, input: &[u8]) -> ZstdResult<Vec<u8>> {
        let mut chunk = vec![0u8; self.zstd.c_stream_out_size()];
        let mut compressed = Vec::new();

        let mut offset = 0;
        while offset < input.len() {
            let progress = self.write(&input[offset..], &mut chunk)?;
            offset += progress.consumed;
            compressed.extend_from_slice(&chunk[..progress.written]);
        }

        loop {
            let progress = self.finish(&mut chunk)?;
            compressed.extend_from_slice(&chunk[..progress.written]);
            if progress.remaining == 0 {
                break;
            }
        }

        trace!(input = input.len(), output = compressed.len(), "stream compressed");
        Ok(compressed)
    }
}

impl Drop for CompressionStream<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.zstd.ZSTD_freeCStream)(self.ptr.as_ptr());
        }
    }
}

/// Streaming decompressor. Borrows its dictionary, if any, for `'d`.
pub struct DecompressionStream<'d> {
    zstd: Zstd,
    ptr: NonNull<DStream>,
    _dictionary: PhantomData<&'d DecompressionDictionary>,
}

// Safety: see `CompressionContext`.
unsafe impl Send for DecompressionStream<'_> {}

impl DecompressionStream<'static> {
    pub fn new(zstd: &Zstd) -> ZstdResult<Self> {
        let stream = Self::create(zstd)?;
        let result = unsafe { (zstd.ZSTD_initDStream)(stream.ptr.as_ptr()) };
        zstd.check(result)?;
        Ok(stream)
    }
}

impl<'d> DecompressionStream<'d> {
    pub fn with_dictionary(
        zstd: &Zstd,
        dictionary: &'d DecompressionDictionary,
    ) -> ZstdResult<Self> {
        let stream = Self::create(zstd)?;
        let result =
            unsafe { (zstd.ZSTD_initDStream_usingDDict)(stream.ptr.as_ptr(), dictionary.as_ptr()) };
        zstd.check(result)?;
        Ok(stream)
    }

    fn create(zstd: &Zstd) -> ZstdResult<Self> {
        let ptr = allocated(unsafe { (zstd.ZSTD_createDStream)() }, "decompression stream")?;
        Ok(Self {
            zstd: zstd.clone(),
            ptr,
            _dictionary: PhantomData,
        })
    }

    pub fn as_ptr(&self) -> *mut DStream {
        self.ptr.as_ptr()
    }

    /// One `ZSTD_decompressStream` call. `remaining` is 0 once a frame has
    /// been fully decoded and flushed.
    pub fn decompress_chunk(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> ZstdResult<StreamProgress> {
        let mut in_buffer = InBuffer::new(input);
        let mut out_buffer = OutBuffer::new(output);
        let result = unsafe {
            (self.zstd.ZSTD_decompressStream)(self.as_ptr(), &mut out_buffer, &mut in_buffer)
        };
        let remaining = self.zstd.check(result)?;
        Ok(StreamProgress {
            consumed: in_buffer.pos,
            written: out_buffer.pos,
            remaining,
        })
    }

    /// Decode every frame in `input`. Truncated input is an error.
    pub fn decompress_all(&mut self, input: &[u8]) -> ZstdResult<Vec<u8>> {
        let mut chunk = vec![0u8; self.zstd.d_stream_out_size()];
        let mut decompressed = Vec::new();

        let mut offset = 0;
        loop {
            let progress = self.decompress_chunk(&input[offset..], &mut chunk)?;
            offset += progress.consumed;
            decompressed.extend_from_slice(&chunk[..progress.written]);

            let output_full = progress.written == chunk.len();
            if offset == input.len() && !output_full {
                if progress.remaining != 0 {
                    return Err(ZstdError::Native {
                        code: ErrorCode::SrcSizeWrong,
                        name: "Src size is incorrect".to_string(),
                    });
                }
                break;
            }
        }

        trace!(input = input.len(), output = decompressed.len(), "stream decompressed");
        Ok(decompressed)
    }
}

impl Drop for DecompressionStream<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.zstd.ZSTD_freeDStream)(self.ptr.as_ptr());
        }
    }
}

/// Train a dictionary of at most `capacity` bytes from `samples`.
pub fn train_dictionary(zstd: &Zstd, samples: &[&[u8]], capacity: usize) -> ZstdResult<Vec<u8>> {
    let sizes: Vec<usize> = samples.iter().map(|sample| sample.len()).collect();
    let buffer = samples.concat();
    let mut dictionary = vec![0u8; capacity];
    let result = zstd.train_from_buffer(&mut dictionary, &buffer, &sizes);
    let size = zstd.check_dict(result)?;
    dictionary.truncate(size);
    Ok(dictionary)
}
