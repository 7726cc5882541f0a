//! DocTrack Records — receiving record workflow, outgoing documents,
//! uploaded file storage and the dashboard analytics built on top of them.

pub mod analytics;
pub mod municipality;
pub mod outgoing;
pub mod storage;
pub mod store;

pub use analytics::{CategoryBreakdown, MunicipalityStats, NamedValue, OrmMonth, QuickStats};
pub use outgoing::{OutgoingInput, OutgoingQuery, OutgoingService};
pub use storage::{FileStorage, LocalDiskStorage, StorageConfig, Upload};
pub use store::{DepartmentUpdateInput, RecordInput, RecordService, RecordStatistics};
