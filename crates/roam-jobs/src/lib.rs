//! Job lifecycle and progress fan-out
//!
//! The [`JobRegistry`] exclusively owns every job record: creation,
//! progress counter updates, terminal transitions, cancellation signals,
//! cleanup, and retention housekeeping. All mutation happens in short
//! critical sections behind one lock; the dispatcher and the HTTP layer
//! only ever hold snapshots.
//!
//! The [`Broadcaster`] fans job events out to subscribed clients, keyed by
//! job identifier and opaque client handles - no back-pointers from clients
//! to job records, so nothing here can form a reference cycle.

mod broadcast;
mod error;
mod model;
mod registry;

pub use broadcast::{Broadcaster, ClientId, EventKind, JobEvent};
pub use error::{JobError, Result};
pub use model::{FieldPair, Job, JobStatus, Progress, RoutingConfig};
pub use registry::{JobRegistry, RetentionPolicy};
