//! POSIX shared-memory region.
//!
//! The named mapping is a `shm_open` object; the cross-process "mutex" is
//! an advisory `fcntl` write lock on the region's first byte. The kernel
//! releases the lock when its holder dies, so a crashed producer can never
//! wedge a consumer.

use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;
use std::ptr;

use tracing::debug;

use crate::error::TransportError;

#[derive(Debug)]
pub(crate) struct RegionImpl {
    fd: RawFd,
    base: *mut u8,
    size: usize,
    shm_name: CString,
    owner: bool,
}

// SAFETY: the raw mapping pointer is only dereferenced under the region
// lock, and the region itself is append-free fixed-size memory.
unsafe impl Send for RegionImpl {}
// SAFETY: as above; all mutation goes through locked_write/locked_read.
unsafe impl Sync for RegionImpl {}

/// POSIX shm names live in a single slash-rooted namespace.
fn shm_name(name: &str) -> Result<CString, TransportError> {
    CString::new(format!("/{name}")).map_err(|_| TransportError::Os {
        op: "shm_open name",
        source: io::Error::new(io::ErrorKind::InvalidInput, "interior NUL in region name"),
    })
}

impl RegionImpl {
    pub(crate) fn create(
        name: &str,
        _lock_name: &str,
        size: usize,
    ) -> Result<Self, TransportError> {
        let c_name = shm_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string; flags and mode
        // are plain constants.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o600) };
        if fd < 0 {
            return Err(TransportError::os("shm_open"));
        }
        // SAFETY: fd is a freshly opened shm descriptor.
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = TransportError::os("ftruncate");
            // SAFETY: fd came from shm_open above.
            unsafe { libc::close(fd) };
            return Err(err);
        }
        let base = Self::map(fd, size)?;
        debug!(name, size, "created shared telemetry region");
        Ok(Self {
            fd,
            base,
            size,
            shm_name: c_name,
            owner: true,
        })
    }

    pub(crate) fn open_existing(
        name: &str,
        _lock_name: &str,
        size: usize,
    ) -> Result<Self, TransportError> {
        let c_name = shm_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string. O_RDWR so the
        // descriptor can take the write lock used for reads.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            return if err.raw_os_error() == Some(libc::ENOENT) {
                Err(TransportError::NotFound {
                    name: name.to_string(),
                })
            } else {
                Err(TransportError::Os {
                    op: "shm_open",
                    source: err,
                })
            };
        }
        let base = Self::map(fd, size)?;
        debug!(name, size, "opened shared telemetry region");
        Ok(Self {
            fd,
            base,
            size,
            shm_name: c_name,
            owner: false,
        })
    }

    fn map(fd: RawFd, size: usize) -> Result<*mut u8, TransportError> {
        // SAFETY: fd is a valid shm descriptor sized by ftruncate; a
        // MAP_SHARED read/write mapping of it is well-defined.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            let err = TransportError::os("mmap");
            // SAFETY: fd came from shm_open.
            unsafe { libc::close(fd) };
            return Err(err);
        }
        Ok(base.cast())
    }

    fn lock(&self) -> Result<(), TransportError> {
        if self.fcntl_lock(libc::F_WRLCK) != 0 {
            return Err(TransportError::os("fcntl(F_SETLKW)"));
        }
        Ok(())
    }

    fn unlock(&self) {
        if self.fcntl_lock(libc::F_UNLCK) != 0 {
            debug!("failed to release region lock: {}", io::Error::last_os_error());
        }
    }

    fn fcntl_lock(&self, l_type: libc::c_int) -> libc::c_int {
        // SAFETY: flock is plain-old-data; every field consulted by
        // F_SETLKW is assigned below.
        let mut flock: libc::flock = unsafe { std::mem::zeroed() };
        flock.l_type = l_type as libc::c_short;
        flock.l_whence = libc::SEEK_SET as libc::c_short;
        flock.l_start = 0;
        flock.l_len = 1;
        // SAFETY: fd is open for the lifetime of self and the pointer
        // outlives the call.
        unsafe { libc::fcntl(self.fd, libc::F_SETLKW, &flock as *const libc::flock) }
    }

    pub(crate) fn locked_write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.lock()?;
        // SAFETY: base..base+size is a live mapping and bytes.len() was
        // bounds-checked by the caller; the byte-range lock serializes
        // cross-process access.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), self.base, bytes.len());
        }
        self.unlock();
        Ok(())
    }

    pub(crate) fn locked_read(&self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.lock()?;
        // SAFETY: as in locked_write; buf.len() was bounds-checked.
        unsafe {
            ptr::copy_nonoverlapping(self.base, buf.as_mut_ptr(), buf.len());
        }
        self.unlock();
        Ok(())
    }
}

impl Drop for RegionImpl {
    fn drop(&mut self) {
        // SAFETY: base/size describe the mapping created in map(); fd is
        // still open.
        unsafe {
            libc::munmap(self.base.cast(), self.size);
            libc::close(self.fd);
        }
        if self.owner {
            // SAFETY: shm_name is the NUL-terminated name passed to
            // shm_open. Unlinking lets the name die with the producer;
            // attached consumers keep their mapping until they drop it.
            unsafe {
                libc::shm_unlink(self.shm_name.as_ptr());
            }
        }
    }
}
