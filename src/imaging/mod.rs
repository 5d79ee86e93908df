pub mod blob;
pub use blob::BlobDetector;
pub mod fallback;
pub use fallback::ContourFallbackDetector;
pub mod morphology;
pub mod raster;
pub use raster::{GrayRaster, LoadError, Raster};
pub mod segmentation;
pub use segmentation::{Segmentation, SegmentationEngine, SegmentationError};
pub mod shape;
pub mod watershed;
pub use watershed::{BOUNDARY, LabelMap};
