//! Shared environment configuration for the solver binaries.
//!
//! Consolidates the `YAHTZEE_BASE_PATH` and `RAYON_NUM_THREADS` reads so
//! every binary resolves paths and sizes the worker pool the same way.

use std::path::PathBuf;

/// Read `YAHTZEE_BASE_PATH` (default `"."`), chdir there. Exits on failure.
pub fn init_base_path() -> PathBuf {
    let base_path = std::env::var("YAHTZEE_BASE_PATH").unwrap_or_else(|_| ".".to_string());
    let path = PathBuf::from(&base_path);
    if std::env::set_current_dir(&base_path).is_err() {
        eprintln!("Failed to change directory to {base_path}");
        std::process::exit(1);
    }
    path
}

/// Read `RAYON_NUM_THREADS` (default: available hardware parallelism) and
/// build the global rayon pool. Returns the thread count.
pub fn init_rayon_threads() -> usize {
    let num_threads = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .ok(); // May already be initialized (tests, embedding callers).
    println!("Worker threads: {num_threads}");
    num_threads
}
