use crate::config::ConfigError;
use crate::source::SourceError;
use rig_fusion_aruco::LocatorError;
use rig_fusion_core::FrameError;

/// Top-level failures that stop the pipeline.
///
/// Retryable calibration failures are reported as
/// [`CalibrationTick`](crate::CalibrationTick) values and steady-state
/// failures as [`Estimate::Invalid`](crate::Estimate::Invalid); neither
/// surfaces here.
#[derive(thiserror::Error, Debug)]
pub enum FusionError {
    #[error("sensor connection failed: {0}")]
    Connection(#[source] SourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error("calibration transform is not invertible: {0}")]
    Calibration(#[from] FrameError),
    #[error(transparent)]
    Source(#[from] SourceError),
}
