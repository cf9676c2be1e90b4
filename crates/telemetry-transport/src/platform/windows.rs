//! Windows shared-memory region: named file mapping plus named mutex.

use std::io;
use std::os::windows::ffi::OsStrExt;
use std::ptr;

use tracing::debug;

use winapi::shared::minwindef::DWORD;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::memoryapi::{
    CreateFileMappingW, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, FILE_MAP_READ,
    FILE_MAP_WRITE,
};
use winapi::um::synchapi::{CreateMutexW, ReleaseMutex, WaitForSingleObject};
use winapi::um::winbase::{OpenMutexW, INFINITE, WAIT_OBJECT_0};
use winapi::um::winnt::{HANDLE, PAGE_READWRITE, SYNCHRONIZE};

use crate::error::TransportError;

const ERROR_FILE_NOT_FOUND: DWORD = 2;
/// Required by `ReleaseMutex`; not part of `SYNCHRONIZE`.
const MUTEX_MODIFY_STATE: DWORD = 0x0001;

#[derive(Debug)]
pub(crate) struct RegionImpl {
    mapping: HANDLE,
    mutex: HANDLE,
    base: *mut u8,
    size: usize,
}

// SAFETY: the raw view pointer is only dereferenced while holding the
// named mutex; handles are process-global kernel objects.
unsafe impl Send for RegionImpl {}
// SAFETY: as above.
unsafe impl Sync for RegionImpl {}

fn to_wide_null_terminated(value: &str) -> Vec<u16> {
    std::ffi::OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn last_error() -> io::Error {
    // SAFETY: trivial thread-local read.
    io::Error::from_raw_os_error(unsafe { GetLastError() } as i32)
}

impl RegionImpl {
    pub(crate) fn create(
        name: &str,
        lock_name: &str,
        size: usize,
    ) -> Result<Self, TransportError> {
        let wide_name = to_wide_null_terminated(name);
        let wide_lock = to_wide_null_terminated(lock_name);

        // SAFETY: INVALID_HANDLE_VALUE requests a pagefile-backed mapping;
        // the name is NUL-terminated UTF-16.
        let mapping = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                ptr::null_mut(),
                PAGE_READWRITE,
                0,
                size as DWORD,
                wide_name.as_ptr(),
            )
        };
        if mapping.is_null() {
            return Err(TransportError::Os {
                op: "CreateFileMappingW",
                source: last_error(),
            });
        }

        // SAFETY: plain named-mutex creation; reopening an existing name
        // returns a handle to the same object.
        let mutex = unsafe { CreateMutexW(ptr::null_mut(), 0, wide_lock.as_ptr()) };
        if mutex.is_null() {
            let err = last_error();
            // SAFETY: mapping was created above.
            unsafe { CloseHandle(mapping) };
            return Err(TransportError::Os {
                op: "CreateMutexW",
                source: err,
            });
        }

        let base = Self::map_view(mapping, mutex, size)?;
        debug!(name, size, "created shared telemetry region");
        Ok(Self {
            mapping,
            mutex,
            base,
            size,
        })
    }

    pub(crate) fn open_existing(
        name: &str,
        lock_name: &str,
        size: usize,
    ) -> Result<Self, TransportError> {
        let wide_name = to_wide_null_terminated(name);
        let wide_lock = to_wide_null_terminated(lock_name);

        // SAFETY: read/write access so the same code path serves producer
        // restarts; the name is NUL-terminated UTF-16.
        let mapping =
            unsafe { OpenFileMappingW(FILE_MAP_READ | FILE_MAP_WRITE, 0, wide_name.as_ptr()) };
        if mapping.is_null() {
            let raw = unsafe { GetLastError() };
            return if raw == ERROR_FILE_NOT_FOUND {
                Err(TransportError::NotFound {
                    name: name.to_string(),
                })
            } else {
                Err(TransportError::Os {
                    op: "OpenFileMappingW",
                    source: io::Error::from_raw_os_error(raw as i32),
                })
            };
        }

        // SAFETY: plain named-mutex open.
        let mutex =
            unsafe { OpenMutexW(SYNCHRONIZE | MUTEX_MODIFY_STATE, 0, wide_lock.as_ptr()) };
        if mutex.is_null() {
            let raw = unsafe { GetLastError() };
            // SAFETY: mapping was opened above.
            unsafe { CloseHandle(mapping) };
            return if raw == ERROR_FILE_NOT_FOUND {
                Err(TransportError::NotFound {
                    name: lock_name.to_string(),
                })
            } else {
                Err(TransportError::Os {
                    op: "OpenMutexW",
                    source: io::Error::from_raw_os_error(raw as i32),
                })
            };
        }

        let base = Self::map_view(mapping, mutex, size)?;
        debug!(name, size, "opened shared telemetry region");
        Ok(Self {
            mapping,
            mutex,
            base,
            size,
        })
    }

    fn map_view(mapping: HANDLE, mutex: HANDLE, size: usize) -> Result<*mut u8, TransportError> {
        // SAFETY: mapping is a live file-mapping handle; a full-size
        // read/write view of it is well-defined.
        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_READ | FILE_MAP_WRITE, 0, 0, size) };
        if view.is_null() {
            let err = last_error();
            // SAFETY: both handles were opened by the caller.
            unsafe {
                CloseHandle(mutex);
                CloseHandle(mapping);
            }
            return Err(TransportError::Os {
                op: "MapViewOfFile",
                source: err,
            });
        }
        Ok(view.cast())
    }

    fn lock(&self) -> Result<(), TransportError> {
        // SAFETY: mutex is a live handle for the lifetime of self.
        let wait = unsafe { WaitForSingleObject(self.mutex, INFINITE) };
        // WAIT_ABANDONED still grants ownership; the region contents are
        // a whole-record overwrite, so an abandoned lock is recoverable.
        if wait == WAIT_OBJECT_0 || wait == 0x0000_0080 {
            Ok(())
        } else {
            Err(TransportError::Os {
                op: "WaitForSingleObject",
                source: last_error(),
            })
        }
    }

    fn unlock(&self) {
        // SAFETY: the calling thread owns the mutex via lock().
        if unsafe { ReleaseMutex(self.mutex) } == 0 {
            debug!("failed to release region mutex: {}", last_error());
        }
    }

    pub(crate) fn locked_write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.lock()?;
        // SAFETY: base..base+size is a live view and bytes.len() was
        // bounds-checked by the caller; the named mutex serializes access.
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
        // SAFETY: view and handles are live until this point. The named
        // objects vanish when the last process closes them.
        unsafe {
            UnmapViewOfFile(self.base.cast());
            CloseHandle(self.mutex);
            CloseHandle(self.mapping);
        }
    }
}
