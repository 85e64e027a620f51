//! Service layer: session lifecycle, interview loop, feedback generation.

pub mod feedback;
pub mod interview;
pub mod session;
