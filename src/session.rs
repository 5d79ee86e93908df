//! One plate image with its detection and edit history.

use image::{Rgb, RgbImage};
use kornia::image::ImageError;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::correction::{Correction, CorrectionEngine};
use crate::export::annotate::draw_annotations;
use crate::history::Action;
use crate::imaging::{
    BlobDetector, ContourFallbackDetector, GrayRaster, LoadError, Raster, Segmentation,
    SegmentationEngine,
};
use crate::model::{ContourRegion, Keypoint, Timepoint};
use crate::naming::{NameResolver, ResolvedName};
use crate::params::{DetectionParams, ParamsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Detected,
    Edited,
}

/// Pushed to every subscriber after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    CountChanged { total: usize },
    StateChanged(SessionState),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no image loaded")]
    NotLoaded,
    #[error("image has not been through detection yet")]
    NotDetected,
    #[error("invalid detection params: {0}")]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("kornia image error: {0}")]
    Gray(#[from] ImageError),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Calls are expected to be serialized by the owner; nothing here locks.
#[derive(Debug)]
pub struct DetectionSession {
    image_path: PathBuf,
    raster: Option<Raster>,
    gray: Option<GrayRaster>,
    params: DetectionParams,
    segmentation: Option<Segmentation>,
    engine: CorrectionEngine,
    state: SessionState,
    resolver: NameResolver,
    name: OnceLock<ResolvedName>,
    subscribers: Vec<UnboundedSender<SessionEvent>>,
}

impl DetectionSession {
    pub fn new(image_path: impl Into<PathBuf>, resolver: NameResolver) -> Self {
        let params = DetectionParams::default();
        Self {
            image_path: image_path.into(),
            raster: None,
            gray: None,
            engine: CorrectionEngine::new(params.new_keypoint_radius),
            params,
            segmentation: None,
            state: SessionState::Empty,
            resolver,
            name: OnceLock::new(),
            subscribers: Vec::new(),
        }
    }

    /// Loads and runs the first detection.
    pub fn open(
        image_path: &Path,
        params: &DetectionParams,
        resolver: NameResolver,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(image_path, resolver);
        session.load()?;
        session.recount(params)?;
        Ok(session)
    }

    /// Builds a loaded session from pixels already in memory.
    pub fn from_raster(
        image_path: impl Into<PathBuf>,
        raster: Raster,
        resolver: NameResolver,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(image_path, resolver);
        session.install(raster)?;
        Ok(session)
    }

    pub fn load(&mut self) -> Result<(), SessionError> {
        let raster = Raster::load(&self.image_path)?;
        self.install(raster)
    }

    fn install(&mut self, raster: Raster) -> Result<(), SessionError> {
        let gray = raster.to_gray()?;
        debug!(
            "loaded {} ({}x{}, {} channels)",
            self.image_path.display(),
            raster.width(),
            raster.height(),
            raster.channels()
        );
        self.raster = Some(raster);
        self.gray = Some(gray);
        self.set_state(SessionState::Loaded);
        Ok(())
    }

    /// Re-runs segmentation, blob extraction and the contour fallback under
    /// `params`. Manual keypoints are kept; the edit history starts over.
    pub fn recount(&mut self, params: &DetectionParams) -> Result<(), SessionError> {
        params.validate()?;
        let (Some(raster), Some(gray)) = (&self.raster, &self.gray) else {
            return Err(SessionError::NotLoaded);
        };

        let (blobs, regions, segmentation) = match SegmentationEngine.run(raster, gray, params) {
            Ok(seg) => {
                let blobs = BlobDetector::new(params).detect(&seg.preprocessed);
                let regions = ContourFallbackDetector::new(params).detect(
                    raster.width(),
                    raster.height(),
                    &blobs,
                    Some(&seg.foreground),
                );
                (blobs, regions, Some(seg))
            }
            Err(e) => {
                warn!(
                    "segmentation failed for {}: {e}; no detections",
                    self.image_path.display()
                );
                (Vec::new(), Vec::new(), None)
            }
        };
        info!(
            "{}: {} blobs, {} fallback contours",
            self.image_path.display(),
            blobs.len(),
            regions.len()
        );

        self.params = params.clone();
        self.segmentation = segmentation;
        self.engine.set_new_keypoint_radius(params.new_keypoint_radius);
        self.engine.replace_detection(&blobs, regions);
        self.set_state(SessionState::Detected);
        self.emit(SessionEvent::CountChanged {
            total: self.engine.total(),
        });
        Ok(())
    }

    /// Single hit-test edit at a scene-space point.
    pub fn correct(&mut self, point: (f32, f32)) -> Result<Correction, SessionError> {
        match self.state {
            SessionState::Empty => return Err(SessionError::NotLoaded),
            SessionState::Loaded => return Err(SessionError::NotDetected),
            SessionState::Detected | SessionState::Edited => {}
        }
        let outcome = self.engine.hit_test(point);
        debug!("correction at {point:?}: {outcome:?}");
        self.edited();
        Ok(outcome)
    }

    pub fn undo(&mut self) -> Option<Action> {
        let action = self.engine.undo();
        match &action {
            Some(_) => self.edited(),
            None => debug!("nothing to undo"),
        }
        action
    }

    pub fn redo(&mut self) -> Option<Action> {
        let action = self.engine.redo();
        match &action {
            Some(_) => self.edited(),
            None => debug!("nothing to redo"),
        }
        action
    }

    fn edited(&mut self) {
        self.set_state(SessionState::Edited);
        self.emit(SessionEvent::CountChanged {
            total: self.engine.total(),
        });
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
            self.emit(SessionEvent::StateChanged(state));
        }
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub fn path(&self) -> &Path {
        &self.image_path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    pub fn raster(&self) -> Option<&Raster> {
        self.raster.as_ref()
    }

    pub fn segmentation(&self) -> Option<&Segmentation> {
        self.segmentation.as_ref()
    }

    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.engine.keypoints()
    }

    pub fn contours(&self) -> impl Iterator<Item = &ContourRegion> {
        self.engine.contours()
    }

    pub fn total(&self) -> usize {
        self.engine.total()
    }

    pub fn can_undo(&self) -> bool {
        self.engine.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.history().can_redo()
    }

    pub fn resolved_name(&self) -> &ResolvedName {
        self.name.get_or_init(|| self.resolver.resolve(&self.image_path))
    }

    pub fn display_name(&self) -> &str {
        &self.resolved_name().display_name
    }

    /// Recomputed from the live sets on every call.
    pub fn timepoint(&self) -> Option<Timepoint> {
        self.resolved_name().timepoint(self.engine.total())
    }

    /// Copy of the image with every live keypoint and contour drawn on it.
    pub fn annotated_image(&self, color: Rgb<u8>, thickness: u32) -> Option<RgbImage> {
        let mut canvas = self.raster.as_ref()?.as_rgb().clone();
        draw_annotations(
            &mut canvas,
            self.engine.keypoints(),
            self.engine.contours(),
            color,
            thickness,
        );
        Some(canvas)
    }
}
