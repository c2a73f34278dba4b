//! Print macros for kernel output.
//!
//! Diagnostics that matter for correctness go through `log`; these macros
//! only back the handful of places (panic banner, boot banner) that want a
//! plain serial line regardless of the configured log level.

#[cfg(target_arch = "x86_64")]
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::serial::_print(format_args!($($arg)*)));
}

#[cfg(target_arch = "x86_64")]
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[cfg(not(target_arch = "x86_64"))]
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {};
}

#[cfg(not(target_arch = "x86_64"))]
#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {};
}
