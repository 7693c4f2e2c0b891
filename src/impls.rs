pub use on_disk::JournalFile;

mod in_memory;
mod on_disk;
