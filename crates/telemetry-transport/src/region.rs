//! Cross-process shared-memory region for the telemetry record.

use crate::error::TransportError;
use crate::platform;
use crate::{MAPPING_NAME, MAPPING_SIZE, MUTEX_NAME};

/// A named shared-memory window holding the latest serialized record.
///
/// The producer [`create`](SharedTelemetryRegion::create)s the region and
/// rewrites it every frame; consumers
/// [`open_existing`](SharedTelemetryRegion::open_existing) the same name
/// and copy the bytes out. Every access holds the region's cross-process
/// lock for exactly the length of the copy, so a reader observes either
/// the previous or the next complete record, never a torn one.
#[derive(Debug)]
pub struct SharedTelemetryRegion {
    inner: platform::RegionImpl,
    size: usize,
}

impl SharedTelemetryRegion {
    /// Create (or reopen) the region under the default names.
    pub fn create() -> Result<Self, TransportError> {
        Self::create_named(MAPPING_NAME, MUTEX_NAME, MAPPING_SIZE)
    }

    /// Create (or reopen) a region under explicit names. Used by tests to
    /// keep parallel runs from colliding.
    pub fn create_named(
        name: &str,
        lock_name: &str,
        size: usize,
    ) -> Result<Self, TransportError> {
        let inner = platform::RegionImpl::create(name, lock_name, size)?;
        Ok(Self { inner, size })
    }

    /// Open the region under the default names, failing fast with
    /// [`TransportError::NotFound`] while the producer is absent.
    pub fn open_existing() -> Result<Self, TransportError> {
        Self::open_existing_named(MAPPING_NAME, MUTEX_NAME, MAPPING_SIZE)
    }

    /// Open a region under explicit names.
    pub fn open_existing_named(
        name: &str,
        lock_name: &str,
        size: usize,
    ) -> Result<Self, TransportError> {
        let inner = platform::RegionImpl::open_existing(name, lock_name, size)?;
        Ok(Self { inner, size })
    }

    /// Region size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Write `bytes` at offset 0 under the cross-process lock.
    pub fn write_record(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > self.size {
            return Err(TransportError::OutOfBounds {
                len: bytes.len(),
                region: self.size,
            });
        }
        self.inner.locked_write(bytes)
    }

    /// Read `buf.len()` bytes from offset 0 under the cross-process lock.
    pub fn read_record(&self, buf: &mut [u8]) -> Result<(), TransportError> {
        if buf.len() > self.size {
            return Err(TransportError::OutOfBounds {
                len: buf.len(),
                region: self.size,
            });
        }
        self.inner.locked_read(buf)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn unique_names(tag: &str) -> (String, String) {
        let pid = std::process::id();
        (
            format!("simmotion-test-{tag}-{pid}"),
            format!("simmotion-test-{tag}-lock-{pid}"),
        )
    }

    #[test]
    fn test_create_write_read_round_trip() -> Result<(), TransportError> {
        let (name, lock) = unique_names("roundtrip");
        let producer = SharedTelemetryRegion::create_named(&name, &lock, 256)?;
        let consumer = SharedTelemetryRegion::open_existing_named(&name, &lock, 256)?;

        let payload: Vec<u8> = (0..=255u8).collect();
        producer.write_record(&payload)?;

        let mut readback = vec![0u8; 256];
        consumer.read_record(&mut readback)?;
        assert_eq!(readback, payload);
        Ok(())
    }

    #[test]
    fn test_open_existing_absent_region_is_not_found() {
        let (name, lock) = unique_names("absent");
        match SharedTelemetryRegion::open_existing_named(&name, &lock, 64) {
            Err(TransportError::NotFound { .. }) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_write_rejected() -> Result<(), TransportError> {
        let (name, lock) = unique_names("bounds");
        let region = SharedTelemetryRegion::create_named(&name, &lock, 16)?;
        let too_big = [0u8; 32];
        assert!(matches!(
            region.write_record(&too_big),
            Err(TransportError::OutOfBounds { .. })
        ));
        Ok(())
    }
}
