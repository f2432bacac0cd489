//! OTA upgrade client: image element parsing and progress bookkeeping.
//!
//! The stack delivers the image in chunks. The first chunk starts with a
//! 6-byte element header (tag id u16 LE, length u32 LE); only the upgrade
//! image tag is accepted.

use log::{error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error as ThisError;

/// Element header length: tag (2) + length (4).
pub const OTA_ELEMENT_HEADER_LEN: usize = 6;
/// Tag id of the upgrade image element.
pub const UPGRADE_IMAGE_TAG: u16 = 0x0000;
/// Default query interval in minutes.
pub const DEFAULT_QUERY_INTERVAL_MIN: u16 = 60;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum OtaError {
    #[error("Invalid element format")]
    InvalidElement,

    #[error("Invalid element length [{length}/{total}]")]
    InvalidElementLength { length: u32, total: u32 },

    #[error("Unsupported element tag identifier {0}")]
    UnsupportedTag(u16),

    #[error("Image incomplete: received {received} of {expected} bytes")]
    Incomplete { received: u32, expected: u32 },

    #[error("Image writer failed: {0}")]
    Writer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaUpgradeStatus {
    Start,
    Receive,
    Apply,
    Check,
    Finish,
    Abort,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OtaHeader {
    pub manufacturer_code: u16,
    pub image_type: u16,
    pub file_version: u32,
    pub image_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtaUpgradeMessage {
    pub status: OtaUpgradeStatus,
    pub header: OtaHeader,
    pub payload: Vec<u8>,
}

/// Query-image response from an OTA server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtaImageInfo {
    pub server_addr: u16,
    pub server_endpoint: u8,
    pub manufacturer_code: u16,
    pub image_type: u16,
    pub file_version: u32,
    pub image_size: u32,
}

/// Progress forwarded to the endpoint that owns the OTA client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaProgress {
    Started,
    Receiving { offset: u32, total: u32 },
    Applying,
    Checked { complete: bool },
    Finished { file_version: u32 },
    Aborted,
    Status(u8),
}

/// Destination of downloaded image bytes.
pub trait OtaImageWriter: Send {
    fn begin(&mut self) -> Result<(), OtaError>;
    fn write(&mut self, data: &[u8]) -> Result<(), OtaError>;
    /// Commit the image; a restart follows on success.
    fn finish(&mut self, header: &OtaHeader) -> Result<(), OtaError>;
}

/// Keeps the image in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageWriter {
    image: Arc<Mutex<Vec<u8>>>,
    committed: Arc<Mutex<Option<OtaHeader>>>,
}

impl MemoryImageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Vec<u8> {
        self.image.lock().clone()
    }

    pub fn committed(&self) -> Option<OtaHeader> {
        *self.committed.lock()
    }
}

impl OtaImageWriter for MemoryImageWriter {
    fn begin(&mut self) -> Result<(), OtaError> {
        self.image.lock().clear();
        *self.committed.lock() = None;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), OtaError> {
        self.image.lock().extend_from_slice(data);
        Ok(())
    }

    fn finish(&mut self, header: &OtaHeader) -> Result<(), OtaError> {
        *self.committed.lock() = Some(*header);
        Ok(())
    }
}

/// Tracks one running upgrade across stack callbacks.
pub struct OtaUpgrade {
    writer: Box<dyn OtaImageWriter>,
    total_size: u32,
    offset: u32,
    element_tag: Option<u16>,
    started_at: Option<Instant>,
}

impl OtaUpgrade {
    pub fn new(writer: Box<dyn OtaImageWriter>) -> Self {
        Self {
            writer,
            total_size: 0,
            offset: 0,
            element_tag: None,
            started_at: None,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Handle one upgrade-status callback.
    pub fn process(&mut self, message: &OtaUpgradeMessage) -> Result<OtaProgress, OtaError> {
        match message.status {
            OtaUpgradeStatus::Start => {
                info!("[OTA] Upgrade start");
                self.started_at = Some(Instant::now());
                self.writer.begin().inspect_err(|e| {
                    error!("[OTA] Failed to begin image: {}", e);
                })?;
                Ok(OtaProgress::Started)
            }
            OtaUpgradeStatus::Receive => {
                self.total_size = message.header.image_size;
                self.offset = self.offset.saturating_add(message.payload.len() as u32);
                info!(
                    "[OTA] Client receives data: progress [{}/{}]",
                    self.offset, self.total_size
                );
                if !message.payload.is_empty() {
                    let data = self.element_data(&message.payload).inspect_err(|e| {
                        error!("[OTA] Failed to parse image element: {}", e);
                    })?;
                    self.writer.write(data).inspect_err(|e| {
                        error!("[OTA] Failed to write image data: {}", e);
                    })?;
                }
                Ok(OtaProgress::Receiving {
                    offset: self.offset,
                    total: self.total_size,
                })
            }
            OtaUpgradeStatus::Apply => {
                info!("[OTA] Upgrade apply");
                Ok(OtaProgress::Applying)
            }
            OtaUpgradeStatus::Check => {
                let result = if self.offset == self.total_size {
                    Ok(OtaProgress::Checked { complete: true })
                } else {
                    Err(OtaError::Incomplete {
                        received: self.offset,
                        expected: self.total_size,
                    })
                };
                self.reset();
                info!(
                    "[OTA] Upgrade check status: {}",
                    if result.is_ok() { "OK" } else { "FAIL" }
                );
                result
            }
            OtaUpgradeStatus::Finish => {
                let elapsed_ms = self
                    .started_at
                    .map(|t| t.elapsed().as_millis())
                    .unwrap_or_default();
                info!(
                    "[OTA] Finish: version 0x{:x}, mfr 0x{:x}, type 0x{:x}, {} bytes, {} ms",
                    message.header.file_version,
                    message.header.manufacturer_code,
                    message.header.image_type,
                    message.header.image_size,
                    elapsed_ms
                );
                self.writer.finish(&message.header).inspect_err(|e| {
                    error!("[OTA] Failed to commit image: {}", e);
                })?;
                Ok(OtaProgress::Finished {
                    file_version: message.header.file_version,
                })
            }
            OtaUpgradeStatus::Abort => {
                warn!("[OTA] Upgrade aborted");
                self.reset();
                Ok(OtaProgress::Aborted)
            }
            OtaUpgradeStatus::Other(code) => {
                info!("[OTA] Status: {}", code);
                Ok(OtaProgress::Status(code))
            }
        }
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.total_size = 0;
        self.element_tag = None;
    }

    /// Strip the element header from the first chunk and validate the tag.
    fn element_data<'a>(&mut self, payload: &'a [u8]) -> Result<&'a [u8], OtaError> {
        let (tag, data) = match self.element_tag {
            Some(tag) => (tag, payload),
            None => {
                if payload.len() <= OTA_ELEMENT_HEADER_LEN {
                    return Err(OtaError::InvalidElement);
                }
                let tag = u16::from_le_bytes([payload[0], payload[1]]);
                let length = u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]);
                if length as u64 + OTA_ELEMENT_HEADER_LEN as u64 != self.total_size as u64 {
                    return Err(OtaError::InvalidElementLength {
                        length,
                        total: self.total_size,
                    });
                }
                self.element_tag = Some(tag);
                (tag, &payload[OTA_ELEMENT_HEADER_LEN..])
            }
        };

        if tag != UPGRADE_IMAGE_TAG {
            return Err(OtaError::UnsupportedTag(tag));
        }
        Ok(data)
    }
}

/// Decide whether a query-image response should be accepted.
pub fn approve_image(image: &OtaImageInfo) -> bool {
    info!(
        "[OTA] Queried image from address 0x{:04x}, endpoint {}",
        image.server_addr, image.server_endpoint
    );
    info!(
        "[OTA] Image version 0x{:x}, manufacturer code 0x{:x}, image size {}",
        image.file_version, image.manufacturer_code, image.image_size
    );
    if image.image_size == 0 {
        info!("[OTA] Rejecting image upgrade, image size is 0");
        return false;
    }
    if image.file_version == 0 {
        info!("[OTA] Rejecting image upgrade, file version is 0");
        return false;
    }
    info!("[OTA] Approving image upgrade");
    true
}
