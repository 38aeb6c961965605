//! State module for tracking crawl progress
//!
//! This module defines the session state machine and the records produced for
//! every fetch attempt.
//!
//! # Components
//!
//! - `SessionStatus`: Idle / Running / Done / Error, with transition rules
//! - `Session`: the status plus the target being processed and timing
//! - `PageRecord`: the structured outcome of one fetch-and-extract attempt

mod page_record;
mod session_state;

// Re-export main types
pub use page_record::{ErrorClass, ImageRecord, LinkRecord, PageOutcome, PageRecord, DEFAULT_TITLE};
pub use session_state::{Session, SessionStatus};
