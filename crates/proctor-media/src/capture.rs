//! Capture Session - live stream lifetime and sink binding
//!
//! A session owns at most one live stream. Acquisition is idempotent for
//! equivalent constraints, binding is decoupled from acquisition so the sink
//! can be swapped without re-acquiring, and release is safe to repeat.

use std::sync::Arc;

use proctor_core::{AcquisitionError, MediaConstraints, SessionGeneration, StreamId};

use crate::{MediaDevices, MediaStream, VideoSink};

/// One supervised capture session
pub struct CaptureSession {
    /// Acquisition capability
    devices: Arc<dyn MediaDevices>,
    /// Generation this session was created for
    generation: SessionGeneration,
    /// The live stream, if acquired
    stream: Option<Box<dyn MediaStream>>,
    /// Sink the stream renders into
    sink: Option<Arc<dyn VideoSink>>,
    last_error: Option<AcquisitionError>,
    acquisitions: u64,
}

impl CaptureSession {
    pub fn new(devices: Arc<dyn MediaDevices>, generation: SessionGeneration) -> Self {
        CaptureSession {
            devices,
            generation,
            stream: None,
            sink: None,
            last_error: None,
            acquisitions: 0,
        }
    }

    /// Acquire a stream satisfying `constraints`.
    ///
    /// Returns the existing stream when one already satisfies the request.
    /// Video is mandatory for a supervised session.
    pub async fn acquire(&mut self, constraints: MediaConstraints) -> Result<StreamId, AcquisitionError> {
        if !constraints.video {
            return Err(AcquisitionError::Other(
                "supervised capture requires a video track".into(),
            ));
        }

        if let Some(stream) = &self.stream {
            if stream.is_live() && stream.constraints().satisfies(&constraints) {
                return Ok(stream.id());
            }
        }

        // Exactly one stream alive: drop whatever is there first
        self.stop_stream();

        let stream = match self.devices.get_user_media(constraints).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(generation = %self.generation, error = %err, "stream acquisition failed");
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        if !stream.constraints().video {
            stream.stop();
            let err = AcquisitionError::NoDevice;
            self.last_error = Some(err.clone());
            return Err(err);
        }

        let id = stream.id();
        self.acquisitions += 1;
        self.last_error = None;

        if let Some(sink) = &self.sink {
            if let Err(reason) = sink.attach(stream.as_ref()) {
                stream.stop();
                let err = AcquisitionError::Other(format!("sink rejected stream: {}", reason));
                self.last_error = Some(err.clone());
                return Err(err);
            }
        }

        tracing::debug!(generation = %self.generation, stream = %id, "stream acquired");
        self.stream = Some(stream);
        Ok(id)
    }

    /// Bind to a rendering sink, replacing any previous one.
    ///
    /// A live stream is attached immediately; otherwise it is attached on the
    /// next successful acquisition.
    pub fn bind(&mut self, sink: Arc<dyn VideoSink>) -> Result<(), AcquisitionError> {
        if let Some(previous) = self.sink.take() {
            if !Arc::ptr_eq(&previous, &sink) {
                previous.detach();
            }
        }

        if let Some(stream) = &self.stream {
            sink.attach(stream.as_ref())
                .map_err(|reason| AcquisitionError::Other(format!("sink rejected stream: {}", reason)))?;
        }

        self.sink = Some(sink);
        Ok(())
    }

    /// Stop all tracks and detach from the sink. Safe to repeat.
    pub fn release(&mut self) {
        let had_stream = self.stream.is_some();
        self.stop_stream();
        if let Some(sink) = self.sink.take() {
            sink.detach();
        }
        if had_stream {
            tracing::debug!(generation = %self.generation, "capture session released");
        }
    }

    fn stop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }
    }

    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    /// Is a stream acquired and still delivering?
    pub fn is_live(&self) -> bool {
        self.stream.as_ref().map(|s| s.is_live()).unwrap_or(false)
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream.as_ref().map(|s| s.id())
    }

    pub fn sink(&self) -> Option<Arc<dyn VideoSink>> {
        self.sink.clone()
    }

    /// Is the live stream rendered by the bound sink?
    pub fn is_bound(&self) -> bool {
        match (&self.stream, &self.sink) {
            (Some(stream), Some(sink)) => sink.attached() == Some(stream.id()),
            _ => false,
        }
    }

    pub fn last_error(&self) -> Option<&AcquisitionError> {
        self.last_error.as_ref()
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}
