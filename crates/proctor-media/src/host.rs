//! Host capabilities consumed by the supervision core
//!
//! These are implemented by the embedding application (browser bridge,
//! desktop shell, test harness). The core never reaches for globals: every
//! capability is handed in explicitly as an `Arc<dyn ...>`.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use proctor_core::{AcquisitionError, DeviceKind, FrameSize, MediaConstraints, PermissionStatus, StreamId};

/// A pushed permission change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionChange {
    pub device: DeviceKind,
    pub status: PermissionStatus,
}

/// Receiver of pushed permission changes
pub type PermissionChangeReceiver = mpsc::UnboundedReceiver<PermissionChange>;

/// Platform permission query capability
#[async_trait]
pub trait PermissionPlatform: Send + Sync {
    /// Query the current grant state of one device.
    /// An `Err` is treated as `Denied` by the monitor.
    async fn query(&self, device: DeviceKind) -> Result<PermissionStatus, String>;

    /// Change notifications, where the platform offers them
    fn subscribe(&self) -> Option<PermissionChangeReceiver> {
        None
    }
}

/// A live audio/video stream owned by whoever acquired it
pub trait MediaStream: Send + Sync {
    fn id(&self) -> StreamId;

    /// Tracks this stream actually carries
    fn constraints(&self) -> MediaConstraints;

    /// False once every track has ended
    fn is_live(&self) -> bool;

    /// Stop every track. Must be idempotent.
    fn stop(&self);
}

impl fmt::Debug for dyn MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Media acquisition capability
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquisitionError>;
}

/// Rendering sink a stream is bound to (video element equivalent).
///
/// The sink is also the frame source for face detection.
pub trait VideoSink: Send + Sync {
    /// Start rendering `stream`, replacing anything already attached
    fn attach(&self, stream: &dyn MediaStream) -> Result<(), String>;

    /// Stop rendering. Must be idempotent.
    fn detach(&self);

    /// Stream currently rendered, if any
    fn attached(&self) -> Option<StreamId>;

    /// Size the sink is displayed at
    fn display_size(&self) -> FrameSize;

    /// Size of the frames currently being rendered
    fn frame_size(&self) -> FrameSize {
        self.display_size()
    }
}
