//! Output Generation
//!
//! Daily snapshot assembly and the sinks snapshots are written to.

pub mod sink;
pub mod snapshot;

pub use sink::*;
pub use snapshot::*;
