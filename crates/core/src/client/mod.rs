//! Backend abstraction: the capability trait, its live and simulated
//! implementations, session handles, and the process-wide selector.

pub mod fake;
pub mod live;
pub mod ops;
pub mod select;
pub mod stream;

pub use fake::SimRuntime;
pub use ops::{BuildSpec, ConnectOpts, RunSpec, RuntimeOps};
pub use select::RuntimeSelector;
pub use stream::{ExecControl, ExecHandle, OutputSource, StreamEvent, StreamHandle};
