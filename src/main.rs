//! Incrementally maintained word counts for a directory of Markdown notes.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module; the
//! engine lives in the `wordcache` library crate.

// mimalloc returns freed pages to the OS promptly; the watch service runs for days.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;

fn main() {
    cli::run();
}
