pub mod batch;
pub mod correction;
pub mod export;
pub mod history;
pub mod imaging;
pub mod model;
pub mod naming;
pub mod params;
pub mod session;

pub use batch::{BatchRunner, CancelToken};
pub use correction::{Correction, CorrectionEngine};
pub use naming::{NameResolver, ResolvedName};
pub use params::{DetectionParams, ExportConfig, ResolverConfig};
pub use session::{DetectionSession, SessionError, SessionEvent, SessionState};
