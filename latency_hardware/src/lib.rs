//! Concrete collaborators for the latency meter: a simulated loopback rig,
//! a terminal screen and a raw-frame brightness probe.
pub mod error;
pub mod raw;
pub mod sim;
pub mod terminal;

pub use raw::{FrameGuard, FramePool, RawFrameProbe};
pub use sim::{SimCamera, SimParams, SimRig, SimScreen};
pub use terminal::{NullScreen, Palette, TerminalScreen};
