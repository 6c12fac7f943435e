//! Native Entry Point Table
//!
//! One `unsafe extern "C" fn` pointer per declared zstd symbol, bound from a
//! loaded [`NativeLibrary`]. Calling a field directly is the raw-pointer form;
//! the slice forms live on [`super::Zstd`].

use std::ffi::{c_char, c_int, c_uint, c_ulonglong, c_void};
use std::fmt;

use super::types::{
    Bounds, CCtx, CDict, CParameter, CStream, DCtx, DDict, DParameter, DStream, EndDirective,
    InBuffer, OutBuffer, ResetDirective,
};
use crate::ffi::{LibraryError, NativeLibrary};

macro_rules! entry_points {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty;
    )*) => {
        /// Function pointers into the native zstd library.
        ///
        /// Field names are the exported C symbol names. The pointers are only
        /// valid while the library they were bound from stays loaded.
        #[allow(non_snake_case)]
        #[derive(Clone, Copy)]
        pub struct ZstdApi {
            $(
                $(#[$meta])*
                pub $name: unsafe extern "C" fn($($arg: $ty),*) -> $ret,
            )*
        }

        impl ZstdApi {
            /// Every bound symbol, in declaration order.
            pub const SYMBOLS: &'static [&'static str] = &[$(stringify!($name)),*];

            /// Resolve every entry point from `library`.
            ///
            /// # Safety
            ///
            /// `library` must be a zstd build exporting these symbols with the
            /// declared C signatures.
            pub(crate) unsafe fn bind(library: &NativeLibrary) -> Result<Self, LibraryError> {
                Ok(Self {
                    $($name: library.symbol(stringify!($name))?,)*
                })
            }
        }
    };
}

entry_points! {
    // Dictionary training
    fn ZDICT_trainFromBuffer(
        dict_buffer: *mut c_void,
        dict_buffer_capacity: usize,
        samples_buffer: *const c_void,
        samples_sizes: *const usize,
        nb_samples: c_uint,
    ) -> usize;
    fn ZDICT_isError(code: usize) -> c_uint;
    fn ZDICT_getErrorName(code: usize) -> *const c_char;

    // Context lifecycle
    fn ZSTD_createCCtx() -> *mut CCtx;
    fn ZSTD_freeCCtx(cctx: *mut CCtx) -> usize;
    fn ZSTD_createDCtx() -> *mut DCtx;
    fn ZSTD_freeDCtx(dctx: *mut DCtx) -> usize;

    // One-shot
    fn ZSTD_compressCCtx(
        cctx: *mut CCtx,
        dst: *mut c_void,
        dst_capacity: usize,
        src: *const c_void,
        src_size: usize,
        compression_level: c_int,
    ) -> usize;
    fn ZSTD_decompressDCtx(
        dctx: *mut DCtx,
        dst: *mut c_void,
        dst_capacity: usize,
        src: *const c_void,
        src_size: usize,
    ) -> usize;
    fn ZSTD_compress2(
        cctx: *mut CCtx,
        dst: *mut c_void,
        dst_capacity: usize,
        src: *const c_void,
        src_size: usize,
    ) -> usize;

    // Digested dictionaries
    fn ZSTD_createCDict(dict: *const c_void, dict_size: usize, compression_level: c_int) -> *mut CDict;
    fn ZSTD_freeCDict(cdict: *mut CDict) -> usize;
    fn ZSTD_compress_usingCDict(
        cctx: *mut CCtx,
        dst: *mut c_void,
        dst_capacity: usize,
        src: *const c_void,
        src_size: usize,
        cdict: *const CDict,
    ) -> usize;
    fn ZSTD_createDDict(dict: *const c_void, dict_size: usize) -> *mut DDict;
    fn ZSTD_freeDDict(ddict: *mut DDict) -> usize;
    fn ZSTD_decompress_usingDDict(
        dctx: *mut DCtx,
        dst: *mut c_void,
        dst_capacity: usize,
        src: *const c_void,
        src_size: usize,
        ddict: *const DDict,
    ) -> usize;

    // Frame inspection
    /// Deprecated upstream in favour of `ZSTD_getFrameContentSize`.
    fn ZSTD_getDecompressedSize(src: *const c_void, src_size: usize) -> c_ulonglong;
    fn ZSTD_getFrameContentSize(src: *const c_void, src_size: usize) -> c_ulonglong;

    // Helpers
    fn ZSTD_maxCLevel() -> c_int;
    fn ZSTD_minCLevel() -> c_int;
    fn ZSTD_compressBound(src_size: usize) -> usize;
    fn ZSTD_isError(code: usize) -> c_uint;
    fn ZSTD_getErrorName(code: usize) -> *const c_char;

    // Advanced parameters
    fn ZSTD_CCtx_reset(cctx: *mut CCtx, reset: ResetDirective) -> usize;
    fn ZSTD_cParam_getBounds(param: CParameter) -> Bounds;
    fn ZSTD_CCtx_setParameter(cctx: *mut CCtx, param: CParameter, value: c_int) -> usize;
    fn ZSTD_DCtx_reset(dctx: *mut DCtx, reset: ResetDirective) -> usize;
    fn ZSTD_dParam_getBounds(param: DParameter) -> Bounds;
    fn ZSTD_DCtx_setParameter(dctx: *mut DCtx, param: DParameter, value: c_int) -> usize;

    // Streaming compression
    fn ZSTD_createCStream() -> *mut CStream;
    fn ZSTD_freeCStream(zcs: *mut CStream) -> usize;
    fn ZSTD_initCStream(zcs: *mut CStream, compression_level: c_int) -> usize;
    fn ZSTD_compressStream(zcs: *mut CStream, output: *mut OutBuffer, input: *mut InBuffer) -> usize;
    fn ZSTD_flushStream(zcs: *mut CStream, output: *mut OutBuffer) -> usize;
    fn ZSTD_endStream(zcs: *mut CStream, output: *mut OutBuffer) -> usize;
    fn ZSTD_CStreamInSize() -> usize;
    fn ZSTD_CStreamOutSize() -> usize;
    fn ZSTD_compressStream2(
        cctx: *mut CCtx,
        output: *mut OutBuffer,
        input: *mut InBuffer,
        end_op: EndDirective,
    ) -> usize;
    fn ZSTD_initCStream_usingCDict(zcs: *mut CStream, cdict: *const CDict) -> usize;
    fn ZSTD_CCtx_refCDict(cctx: *mut CCtx, cdict: *const CDict) -> usize;

    // Streaming decompression
    fn ZSTD_createDStream() -> *mut DStream;
    fn ZSTD_freeDStream(zds: *mut DStream) -> usize;
    fn ZSTD_initDStream(zds: *mut DStream) -> usize;
    fn ZSTD_decompressStream(zds: *mut DStream, output: *mut OutBuffer, input: *mut InBuffer) -> usize;
    fn ZSTD_DStreamInSize() -> usize;
    fn ZSTD_DStreamOutSize() -> usize;
    fn ZSTD_initDStream_usingDDict(zds: *mut DStream, ddict: *const DDict) -> usize;
    fn ZSTD_DCtx_refDDict(dctx: *mut DCtx, ddict: *const DDict) -> usize;
}

impl fmt::Debug for ZstdApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZstdApi")
            .field("symbols", &Self::SYMBOLS.len())
            .finish_non_exhaustive()
    }
}
