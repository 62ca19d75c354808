//! The three child process bodies a coordinator run can fork: rotator,
//! syncer, and the optional postexec hook.

pub mod postexec;
pub mod rotator;
pub mod syncer;
