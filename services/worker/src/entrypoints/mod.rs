//! The two agents this worker can run.
//!
//! - `sdr`: the lead-qualification agent with reference data and tools.
//! - `minimal`: a bare pipeline that greets the room once.

pub mod minimal;
pub mod sdr;
