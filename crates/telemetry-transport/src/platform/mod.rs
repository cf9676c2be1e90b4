//! OS-specific shared-memory region implementations.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::RegionImpl;
#[cfg(windows)]
pub(crate) use windows::RegionImpl;
