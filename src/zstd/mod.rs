//! zstd Bindings
//!
//! The [`ZstdApi`] entry point table, the mirrored ABI constants, and the
//! [`Zstd`] handle that keeps the library loaded while offering slice-based
//! call forms.

mod api;
mod context;
mod error;
mod types;

pub use api::ZstdApi;
pub use context::{
    train_dictionary, CompressionContext, CompressionDictionary, CompressionStream,
    DecompressionContext, DecompressionDictionary, DecompressionStream, StreamProgress,
};
pub use error::{ZstdError, ZstdResult};
pub use types::{
    Bounds, CCtx, CDict, CParameter, CStream, DCtx, DDict, DParameter, DStream, EndDirective,
    BLOCK_SIZE_MAX, ErrorCode, InBuffer, OutBuffer, ResetDirective, ERROR_MAX_CODE,
    ZSTD_CONTENTSIZE_ERROR, ZSTD_CONTENTSIZE_UNKNOWN,
};

use std::ffi::{c_char, CStr};
use std::ops::Deref;
use std::sync::Arc;

use crate::ffi::{self, LibraryError, LibraryResolver, NativeLibrary};

/// Logical name of the native zstd library.
pub const LIBRARY_NAME: &str = "libzstd";

/// A loaded zstd library together with its bound entry points.
///
/// Cloning is cheap and every clone keeps the library mapped. Dereferences to
/// [`ZstdApi`] for the raw-pointer call forms.
#[derive(Clone)]
pub struct Zstd {
    api: ZstdApi,
    library: Arc<NativeLibrary>,
}

impl Zstd {
    /// Load `libzstd` through the process-wide resolver.
    pub fn load() -> Result<Self, LibraryError> {
        Self::load_with(ffi::global())
    }

    /// Load `libzstd` through a specific resolver.
    pub fn load_with(resolver: &LibraryResolver) -> Result<Self, LibraryError> {
        Self::from_library(resolver.load(LIBRARY_NAME)?)
    }

    /// Bind the entry points of an already loaded library.
    pub fn from_library(library: Arc<NativeLibrary>) -> Result<Self, LibraryError> {
        let api = library.zstd()?;
        Ok(Self { api, library })
    }

    pub fn library(&self) -> &Arc<NativeLibrary> {
        &self.library
    }

    pub fn api(&self) -> &ZstdApi {
        &self.api
    }

    pub fn max_c_level(&self) -> i32 {
        unsafe { (self.api.ZSTD_maxCLevel)() }
    }

    pub fn min_c_level(&self) -> i32 {
        unsafe { (self.api.ZSTD_minCLevel)() }
    }

    /// Worst-case compressed size of `src_size` input bytes.
    pub fn compress_bound(&self, src_size: usize) -> usize {
        unsafe { (self.api.ZSTD_compressBound)(src_size) }
    }

    pub fn is_error(&self, code: usize) -> bool {
        unsafe { (self.api.ZSTD_isError)(code) != 0 }
    }

    pub fn error_name(&self, code: usize) -> String {
        error_string(unsafe { (self.api.ZSTD_getErrorName)(code) })
    }

    /// Turn a `size_t` result into `Ok(value)` or a [`ZstdError::Native`].
    pub fn check(&self, code: usize) -> ZstdResult<usize> {
        if !self.is_error(code) {
            return Ok(code);
        }
        Err(ZstdError::Native {
            code: ErrorCode::from_result(code).unwrap_or(ErrorCode::Generic),
            name: self.error_name(code),
        })
    }

    pub fn dict_is_error(&self, code: usize) -> bool {
        unsafe { (self.api.ZDICT_isError)(code) != 0 }
    }

    pub fn dict_error_name(&self, code: usize) -> String {
        error_string(unsafe { (self.api.ZDICT_getErrorName)(code) })
    }

    /// [`Zstd::check`] for results of the dictionary builder.
    pub fn check_dict(&self, code: usize) -> ZstdResult<usize> {
        if !self.dict_is_error(code) {
            return Ok(code);
        }
        Err(ZstdError::Native {
            code: ErrorCode::from_result(code).unwrap_or(ErrorCode::Generic),
            name: self.dict_error_name(code),
        })
    }

    /// Decompressed size recorded in the frame header, or one of
    /// [`ZSTD_CONTENTSIZE_UNKNOWN`] / [`ZSTD_CONTENTSIZE_ERROR`].
    pub fn frame_content_size(&self, src: &[u8]) -> u64 {
        unsafe { (self.api.ZSTD_getFrameContentSize)(src.as_ptr().cast(), src.len()) }
    }

    /// Legacy form of [`Zstd::frame_content_size`]; 0 when unknown or invalid.
    pub fn decompressed_size(&self, src: &[u8]) -> u64 {
        unsafe { (self.api.ZSTD_getDecompressedSize)(src.as_ptr().cast(), src.len()) }
    }

    pub fn c_param_bounds(&self, param: CParameter) -> ZstdResult<Bounds> {
        let bounds = unsafe { (self.api.ZSTD_cParam_getBounds)(param) };
        self.check(bounds.error).map(|_| bounds)
    }

    pub fn d_param_bounds(&self, param: DParameter) -> ZstdResult<Bounds> {
        let bounds = unsafe { (self.api.ZSTD_dParam_getBounds)(param) };
        self.check(bounds.error).map(|_| bounds)
    }

    /// Recommended input chunk size for streaming compression.
    pub fn c_stream_in_size(&self) -> usize {
        unsafe { (self.api.ZSTD_CStreamInSize)() }
    }

    /// Output chunk size that always fits one compressed block.
    pub fn c_stream_out_size(&self) -> usize {
        unsafe { (self.api.ZSTD_CStreamOutSize)() }
    }

    pub fn d_stream_in_size(&self) -> usize {
        unsafe { (self.api.ZSTD_DStreamInSize)() }
    }

    pub fn d_stream_out_size(&self) -> usize {
        unsafe { (self.api.ZSTD_DStreamOutSize)() }
    }

    /// Slice form of `ZDICT_trainFromBuffer`. Returns the raw native result.
    ///
    /// `samples` holds every sample back to back; `sample_sizes` their
    /// lengths. Inconsistent sizes yield the `srcSize_wrong` error result
    /// without calling into the library.
    pub fn train_from_buffer(
        &self,
        dict: &mut [u8],
        samples: &[u8],
        sample_sizes: &[usize],
    ) -> usize {
        let total = sample_sizes
            .iter()
            .try_fold(0usize, |acc, &size| acc.checked_add(size));
        if total.map_or(true, |total| total > samples.len()) {
            return ErrorCode::SrcSizeWrong.to_result();
        }
        let Ok(nb_samples) = u32::try_from(sample_sizes.len()) else {
            return ErrorCode::SrcSizeWrong.to_result();
        };
        unsafe {
            (self.api.ZDICT_trainFromBuffer)(
                dict.as_mut_ptr().cast(),
                dict.len(),
                samples.as_ptr().cast(),
                sample_sizes.as_ptr(),
                nb_samples,
            )
        }
    }

    /// Slice form of `ZSTD_compressCCtx`.
    ///
    /// # Safety
    ///
    /// `cctx` must be a live context created by this library.
    pub unsafe fn compress_cctx(
        &self,
        cctx: *mut CCtx,
        dst: &mut [u8],
        src: &[u8],
        compression_level: i32,
    ) -> usize {
        (self.api.ZSTD_compressCCtx)(
            cctx,
            dst.as_mut_ptr().cast(),
            dst.len(),
            src.as_ptr().cast(),
            src.len(),
            compression_level,
        )
    }

    /// Slice form of `ZSTD_decompressDCtx`.
    ///
    /// # Safety
    ///
    /// `dctx` must be a live context created by this library.
    pub unsafe fn decompress_dctx(&self, dctx: *mut DCtx, dst: &mut [u8], src: &[u8]) -> usize {
        (self.api.ZSTD_decompressDCtx)(
            dctx,
            dst.as_mut_ptr().cast(),
            dst.len(),
            src.as_ptr().cast(),
            src.len(),
        )
    }

    /// Slice form of `ZSTD_compress2`.
    ///
    /// # Safety
    ///
    /// `cctx` must be a live context created by this library.
    pub unsafe fn compress2(&self, cctx: *mut CCtx, dst: &mut [u8], src: &[u8]) -> usize {
        (self.api.ZSTD_compress2)(
            cctx,
            dst.as_mut_ptr().cast(),
            dst.len(),
            src.as_ptr().cast(),
            src.len(),
        )
    }

    /// Slice form of `ZSTD_compress_usingCDict`.
    ///
    /// # Safety
    ///
    /// `cctx` and `cdict` must be live objects created by this library.
    pub unsafe fn compress_using_cdict(
        &self,
        cctx: *mut CCtx,
        dst: &mut [u8],
        src: &[u8],
        cdict: *const CDict,
    ) -> usize {
        (self.api.ZSTD_compress_usingCDict)(
            cctx,
            dst.as_mut_ptr().cast(),
            dst.len(),
            src.as_ptr().cast(),
            src.len(),
            cdict,
        )
    }

    /// Slice form of `ZSTD_decompress_usingDDict`.
    ///
    /// # Safety
    ///
    /// `dctx` and `ddict` must be live objects created by this library.
    pub unsafe fn decompress_using_ddict(
        &self,
        dctx: *mut DCtx,
        dst: &mut [u8],
        src: &[u8],
        ddict: *const DDict,
    ) -> usize {
        (self.api.ZSTD_decompress_usingDDict)(
            dctx,
            dst.as_mut_ptr().cast(),
            dst.len(),
            src.as_ptr().cast(),
            src.len(),
            ddict,
        )
    }
}

impl Deref for Zstd {
    type Target = ZstdApi;

    fn deref(&self) -> &ZstdApi {
        &self.api
    }
}

impl std::fmt::Debug for Zstd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zstd")
            .field("library", &self.library.path())
            .finish()
    }
}

fn error_string(name: *const c_char) -> String {
    if name.is_null() {
        return "Unspecified error code".to_string();
    }
    // Safety: zstd returns pointers to static, NUL-terminated strings.
    unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
}
