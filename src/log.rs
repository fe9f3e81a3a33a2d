// src/log.rs

//! Logging macros.
//!
//! With the `defmt` feature the macros forward to the matching `defmt`
//! macro. Without it they only borrow their arguments so the call sites
//! type-check and compile to nothing.
//!
//! Format strings must stay compatible with both back ends: use `{}` for
//! primitives and `{:?}` for enums.

macro_rules! nav_log {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        defmt::$level!($fmt $(, $arg)*);
        #[cfg(not(feature = "defmt"))]
        {
            let _ = ($(&$arg,)*);
        }
    }};
}

macro_rules! nav_trace {
    ($($arg:tt)*) => {
        nav_log!(trace, $($arg)*)
    };
}

macro_rules! nav_debug {
    ($($arg:tt)*) => {
        nav_log!(debug, $($arg)*)
    };
}

macro_rules! nav_info {
    ($($arg:tt)*) => {
        nav_log!(info, $($arg)*)
    };
}

macro_rules! nav_warn {
    ($($arg:tt)*) => {
        nav_log!(warn, $($arg)*)
    };
}
