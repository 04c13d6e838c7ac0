//! Logging interface, contingent on the `defmt-03` feature or the hidden `__log` feature
//!
//! `defmt-03` wins if both are enabled. Only enable `__log` when debugging, and
//! when you're certain that your logger isn't using USB!

macro_rules! trace {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt::trace!($($args)*);
        #[cfg(all(feature = "__log", not(feature = "defmt-03")))]
        ::__log::trace!($($args)*);
    }};
}

macro_rules! debug {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt::debug!($($args)*);
        #[cfg(all(feature = "__log", not(feature = "defmt-03")))]
        ::__log::debug!($($args)*);
    }};
}

macro_rules! info {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt::info!($($args)*);
        #[cfg(all(feature = "__log", not(feature = "defmt-03")))]
        ::__log::info!($($args)*);
    }};
}

macro_rules! warn {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt::warn!($($args)*);
        #[cfg(all(feature = "__log", not(feature = "defmt-03")))]
        ::__log::warn!($($args)*);
    }};
}

macro_rules! error {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt::error!($($args)*);
        #[cfg(all(feature = "__log", not(feature = "defmt-03")))]
        ::__log::error!($($args)*);
    }};
}
