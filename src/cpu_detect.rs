//! Helpers for CPU feature detection.
//!
//! Uses the `cpufeatures` crate. Each probe has an init that runs once, every
//! subsequent call simply loads and compares a bool.

/// Checks if the CPU supports BMI2 (Bit Manipulation Instruction Set 2).
///
/// The native zstd library ships a build compiled with BMI2 enabled, which
/// speeds up its entropy coders noticeably. That build may only be loaded on
/// CPUs reporting the extension.
///
/// # Returns
/// `true` if the CPU supports BMI2 instructions, `false` otherwise.
#[inline]
#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
pub fn has_bmi2() -> bool {
    cpufeatures::new!(cpuid_bmi2, "bmi2");
    cpuid_bmi2::get()
}

/// BMI2 only exists on x86 processors.
#[inline]
#[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
pub fn has_bmi2() -> bool {
    false
}
