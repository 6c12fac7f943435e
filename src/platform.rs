//! Host Platform Classification
//!
//! Closed enumerations over the operating systems and processor architectures
//! the native library ships for, plus the CPU capability used to pick the
//! optimized library variant.

use std::fmt;

use once_cell::sync::Lazy;

use crate::cpu_detect;

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingSystem {
    Windows,
    Linux,
    MacOs,
    /// Any other OS. Resolution still proceeds, but no library is shipped for it.
    Unsupported,
}

impl OperatingSystem {
    /// Classify the OS this crate was compiled for.
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else if cfg!(target_os = "linux") {
            OperatingSystem::Linux
        } else if cfg!(target_os = "macos") {
            OperatingSystem::MacOs
        } else {
            OperatingSystem::Unsupported
        }
    }

    /// Directory tag used in `<platform>-<arch>`.
    pub const fn tag(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "windows",
            OperatingSystem::Linux => "linux",
            OperatingSystem::MacOs => "osx",
            OperatingSystem::Unsupported => "unknown",
        }
    }

    /// File extension of native shared libraries, including the dot.
    ///
    /// Empty for unsupported systems.
    pub const fn library_extension(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => ".dll",
            OperatingSystem::Linux => ".so",
            OperatingSystem::MacOs => ".dylib",
            OperatingSystem::Unsupported => "",
        }
    }

    pub const fn is_supported(&self) -> bool {
        !matches!(self, OperatingSystem::Unsupported)
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Processor architecture of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    X86,
    X64,
    Arm,
    Arm64,
    Wasm,
    S390x,
    LoongArch64,
    Ppc64le,
    RiscV64,
    Unknown,
}

impl Architecture {
    /// Classify the architecture this crate was compiled for.
    pub const fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Architecture::X64
        } else if cfg!(target_arch = "x86") {
            Architecture::X86
        } else if cfg!(target_arch = "aarch64") {
            Architecture::Arm64
        } else if cfg!(target_arch = "arm") {
            Architecture::Arm
        } else if cfg!(any(target_arch = "wasm32", target_arch = "wasm64")) {
            Architecture::Wasm
        } else if cfg!(target_arch = "s390x") {
            Architecture::S390x
        } else if cfg!(target_arch = "loongarch64") {
            Architecture::LoongArch64
        } else if cfg!(all(target_arch = "powerpc64", target_endian = "little")) {
            Architecture::Ppc64le
        } else if cfg!(target_arch = "riscv64") {
            Architecture::RiscV64
        } else {
            Architecture::Unknown
        }
    }

    /// Lowercase tag used in `<platform>-<arch>`.
    pub const fn tag(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
            Architecture::Wasm => "wasm",
            Architecture::S390x => "s390x",
            Architecture::LoongArch64 => "loongarch64",
            Architecture::Ppc64le => "ppc64le",
            Architecture::RiscV64 => "riscv64",
            Architecture::Unknown => "unknown",
        }
    }

    pub const fn is_supported(&self) -> bool {
        !matches!(self, Architecture::Unknown)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Everything about the host that influences which library file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformDescriptor {
    pub os: OperatingSystem,
    pub arch: Architecture,
    /// Whether the BMI2-optimized library variant may be used.
    pub has_bmi2: bool,
}

static CURRENT: Lazy<PlatformDescriptor> = Lazy::new(PlatformDescriptor::detect);

impl PlatformDescriptor {
    pub const fn new(os: OperatingSystem, arch: Architecture, has_bmi2: bool) -> Self {
        Self { os, arch, has_bmi2 }
    }

    /// The host descriptor, computed once per process.
    pub fn current() -> Self {
        *CURRENT
    }

    /// Probe the host without going through the process-wide cache.
    pub fn detect() -> Self {
        Self::new(
            OperatingSystem::current(),
            Architecture::current(),
            cpu_detect::has_bmi2(),
        )
    }

    /// `<platform>-<arch>` folder name, e.g. `linux-x64`.
    pub fn directory_name(&self) -> String {
        format!("{}-{}", self.os.tag(), self.arch.tag())
    }

    /// Both the OS and the architecture are ones the library ships for.
    pub const fn is_supported(&self) -> bool {
        self.os.is_supported() && self.arch.is_supported()
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)?;
        if self.has_bmi2 {
            write!(f, " (bmi2)")?;
        }
        Ok(())
    }
}
