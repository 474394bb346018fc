/*
 debug! stand-in that logs at info level, and only in debug builds.

 Enabling max_level_debug on the log crate for debug builds makes every dependency
 emit its own debug records too, which slows down indexing runs considerably.
*/

#[macro_export]
macro_rules! i_debug {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(debug_assertions)]
        log::info!(target: $target, $($arg)+)
    );
    ($($arg:tt)+) => (
        #[cfg(debug_assertions)]
        log::info!($($arg)+)
    )
}
