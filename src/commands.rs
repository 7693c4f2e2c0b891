//! The command layer: thin consumers of the journal access engine.
//!
//! Every command takes an opened [`JournalSet`](crate::set::JournalSet) and
//! returns its statistics so runs are testable; printing sticks to the
//! report formats users of the original tooling expect.

pub mod reclaim_tail_waste;
pub mod report_entry_arrays;
pub mod report_layout;
pub mod report_tail_waste;
pub mod report_usage;
pub mod verify_hashes;
