//! Native ABI Types
//!
//! Opaque handles, `#[repr(C)]` structs and constants mirrored from `zstd.h`
//! and `zstd_errors.h`. Every numeric value must match the native library.

use std::ffi::{c_int, c_void};
use std::fmt;
use std::marker::{PhantomData, PhantomPinned};
use std::ptr;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        pub struct $name {
            _data: [u8; 0],
            _marker: PhantomData<(*mut u8, PhantomPinned)>,
        }
    };
}

opaque_handle!(
    /// Native compression context (`ZSTD_CCtx`).
    CCtx
);
opaque_handle!(
    /// Native decompression context (`ZSTD_DCtx`).
    DCtx
);
opaque_handle!(
    /// Digested compression dictionary (`ZSTD_CDict`).
    CDict
);
opaque_handle!(
    /// Digested decompression dictionary (`ZSTD_DDict`).
    DDict
);

/// Streaming compression shares the context type.
pub type CStream = CCtx;
/// Streaming decompression shares the context type.
pub type DStream = DCtx;

/// Returned by `ZSTD_getFrameContentSize` when the frame omits its size.
pub const ZSTD_CONTENTSIZE_UNKNOWN: u64 = u64::MAX;
/// Returned by `ZSTD_getFrameContentSize` for invalid input.
pub const ZSTD_CONTENTSIZE_ERROR: u64 = u64::MAX - 1;

/// Largest error code value; results above `0 - ERROR_MAX_CODE` are errors.
pub const ERROR_MAX_CODE: usize = 120;

/// `ZSTD_BLOCKSIZE_MAX`: the most content a single block decodes to.
pub const BLOCK_SIZE_MAX: usize = 128 * 1024;

/// `ZSTD_ResetDirective`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetDirective {
    SessionOnly = 1,
    Parameters = 2,
    SessionAndParameters = 3,
}

/// `ZSTD_EndDirective`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndDirective {
    /// Collect more data, the encoder decides when to emit blocks
    Continue = 0,
    /// Flush any buffered data as complete blocks
    Flush = 1,
    /// Flush everything and close the frame
    End = 2,
}

/// `ZSTD_cParameter`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CParameter {
    // compression parameters
    CompressionLevel = 100,
    WindowLog = 101,
    HashLog = 102,
    ChainLog = 103,
    SearchLog = 104,
    MinMatch = 105,
    TargetLength = 106,
    Strategy = 107,

    // long distance matching
    EnableLongDistanceMatching = 160,
    LdmHashLog = 161,
    LdmMinMatch = 162,
    LdmBucketSizeLog = 163,
    LdmHashRateLog = 164,

    // frame parameters
    ContentSizeFlag = 200,
    ChecksumFlag = 201,
    DictIdFlag = 202,

    // multi-threading
    NbWorkers = 400,
    JobSize = 401,
    OverlapLog = 402,
}

/// `ZSTD_dParameter`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DParameter {
    WindowLogMax = 100,
}

/// `ZSTD_ErrorCode`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError = 0,
    Generic = 1,
    PrefixUnknown = 10,
    VersionUnsupported = 12,
    FrameParameterUnsupported = 14,
    FrameParameterWindowTooLarge = 16,
    CorruptionDetected = 20,
    ChecksumWrong = 22,
    DictionaryCorrupted = 30,
    DictionaryWrong = 32,
    DictionaryCreationFailed = 34,
    ParameterUnsupported = 40,
    ParameterOutOfBound = 42,
    TableLogTooLarge = 44,
    MaxSymbolValueTooLarge = 46,
    MaxSymbolValueTooSmall = 48,
    StageWrong = 60,
    InitMissing = 62,
    MemoryAllocation = 64,
    WorkSpaceTooSmall = 66,
    DstSizeTooSmall = 70,
    SrcSizeWrong = 72,
    DstBufferNull = 74,
}

impl ErrorCode {
    /// Map a raw `ZSTD_ErrorCode` value. Codes this crate does not mirror
    /// collapse to [`ErrorCode::Generic`].
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => ErrorCode::NoError,
            1 => ErrorCode::Generic,
            10 => ErrorCode::PrefixUnknown,
            12 => ErrorCode::VersionUnsupported,
            14 => ErrorCode::FrameParameterUnsupported,
            16 => ErrorCode::FrameParameterWindowTooLarge,
            20 => ErrorCode::CorruptionDetected,
            22 => ErrorCode::ChecksumWrong,
            30 => ErrorCode::DictionaryCorrupted,
            32 => ErrorCode::DictionaryWrong,
            34 => ErrorCode::DictionaryCreationFailed,
            40 => ErrorCode::ParameterUnsupported,
            42 => ErrorCode::ParameterOutOfBound,
            44 => ErrorCode::TableLogTooLarge,
            46 => ErrorCode::MaxSymbolValueTooLarge,
            48 => ErrorCode::MaxSymbolValueTooSmall,
            60 => ErrorCode::StageWrong,
            62 => ErrorCode::InitMissing,
            64 => ErrorCode::MemoryAllocation,
            66 => ErrorCode::WorkSpaceTooSmall,
            70 => ErrorCode::DstSizeTooSmall,
            72 => ErrorCode::SrcSizeWrong,
            74 => ErrorCode::DstBufferNull,
            _ => ErrorCode::Generic,
        }
    }

    /// Decode a `size_t` function result. `None` when it is not an error.
    ///
    /// zstd reports failures as `0 - code`, so the top of the `size_t`
    /// range is reserved for errors.
    pub fn from_result(result: usize) -> Option<Self> {
        if result <= ERROR_MAX_CODE.wrapping_neg() {
            return None;
        }
        Some(Self::from_raw(result.wrapping_neg() as u32))
    }

    /// The `size_t` result a native function returns for this code.
    pub fn to_result(self) -> usize {
        (self as usize).wrapping_neg()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as u32)
    }
}

/// `ZSTD_bounds`, returned by value from the parameter bound queries.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub error: usize,
    pub lower_bound: c_int,
    pub upper_bound: c_int,
}

impl Bounds {
    pub fn contains(&self, value: c_int) -> bool {
        (self.lower_bound..=self.upper_bound).contains(&value)
    }
}

/// `ZSTD_inBuffer`: data the native side reads from.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InBuffer {
    pub src: *const c_void,
    pub size: usize,
    pub pos: usize,
}

impl InBuffer {
    pub fn new(src: &[u8]) -> Self {
        Self {
            src: src.as_ptr().cast(),
            size: src.len(),
            pos: 0,
        }
    }

    /// An empty buffer with only size and position set.
    pub fn empty(pos: usize, size: usize) -> Self {
        Self {
            src: ptr::null(),
            size,
            pos,
        }
    }

    pub fn is_fully_consumed(&self) -> bool {
        self.size <= self.pos
    }
}

/// `ZSTD_outBuffer`: space the native side writes into.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OutBuffer {
    pub dst: *mut c_void,
    pub size: usize,
    pub pos: usize,
}

impl OutBuffer {
    pub fn new(dst: &mut [u8]) -> Self {
        Self {
            dst: dst.as_mut_ptr().cast(),
            size: dst.len(),
            pos: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.size <= self.pos
    }
}
