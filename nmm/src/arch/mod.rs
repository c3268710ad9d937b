//! Architecture-specific schemes and implementations for the memory manager.
use cfg_if::cfg_if;

#[cfg(feature = "x86_64")]
pub mod x86_64;

cfg_if! {
    if #[cfg(feature = "x86_64")] {
        use self::x86_64 as arch_impl;

        /// The addressing scheme used when the caller doesn't name one.
        pub const DEFAULT_SCHEME: &str = arch_impl::FOUR_LEVEL_NAME;
    }
}
