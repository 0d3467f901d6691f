#![allow(unused_macros)]
#![macro_use]

// Events are only emitted with the `logging` feature; without it the
// arguments are never evaluated.

macro_rules! log_event {
    ($level:ident, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::$level!(target: "dynarray", $($arg)+);
    )
}

macro_rules! debug {
    ($($arg:tt)+) => (
        log_event!(debug, $($arg)+);
    )
}

macro_rules! trace {
    ($($arg:tt)+) => (
        log_event!(trace, $($arg)+);
    )
}
