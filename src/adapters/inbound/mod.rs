pub mod file_journal;
pub mod memory_journal;

pub use file_journal::*;
pub use memory_journal::*;
