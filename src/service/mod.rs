pub mod classify;
pub mod events;
pub mod fuzz;
pub mod header;
pub mod ingest;
pub mod landing;
pub mod period;
pub mod reconciler;
pub mod worker;

pub use classify::{SubjectClassifier, SubjectMatch};
pub use events::{ChannelSink, EventSink, Level, Progress, ProgressEvent};
pub use fuzz::NameScorer;
pub use header::{HeaderFallback, HeaderLocator, HeaderMatch};
pub use ingest::{FoundReport, IngestionOrchestrator, RunSummary};
pub use landing::{LandingSweep, SweepOutcome};
pub use period::{PeriodResolver, Resolution};
pub use reconciler::{MergeSpec, ReportReconciler};
