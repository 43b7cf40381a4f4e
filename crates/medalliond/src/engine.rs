use image::DynamicImage;
use medallion_core::detector::DetectorError;
use medallion_core::{locate_face, FaceRegion, SeetaFaceDetector};
use std::path::Path;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("no face detected")]
    NoFaceDetected,
    #[error("detector thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the detector thread.
enum EngineRequest {
    Locate {
        photo: DynamicImage,
        reply: oneshot::Sender<Result<FaceRegion, EngineError>>,
    },
}

/// Clone-safe handle to the detector thread.
#[derive(Clone)]
pub struct DetectorHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl DetectorHandle {
    /// Suggest a crop region for the most prominent face in `photo`.
    pub async fn locate(&self, photo: DynamicImage) -> Result<FaceRegion, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Locate {
                photo,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the detector on a dedicated OS thread.
///
/// The cascade detector mutates internal pyramid state per detection,
/// so one instance lives on one thread and requests are serialized
/// through a channel. Fails fast if the model cannot be loaded.
pub fn spawn_detector(model_path: &Path) -> Result<DetectorHandle, EngineError> {
    let mut detector = SeetaFaceDetector::load(model_path)?;

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("medallion-detect".into())
        .spawn(move || {
            tracing::info!("detector thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Locate { photo, reply } => {
                        let result = locate_face(&mut detector, &photo)
                            .ok_or(EngineError::NoFaceDetected);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("detector thread exiting");
        })
        .expect("failed to spawn detector thread");

    Ok(DetectorHandle { tx })
}
