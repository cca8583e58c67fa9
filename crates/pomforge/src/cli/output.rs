//! Output mode shared by every subcommand.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

static JSON: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

/// Record the global `--json` / `--quiet` flags.
pub fn init(json: bool, quiet: bool) {
    JSON.store(json, Ordering::Relaxed);
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Pretty-print a JSON document on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: could not encode output: {e}"),
    }
}

/// Human-readable line, suppressed by `--json` and `--quiet`.
pub fn say(line: impl std::fmt::Display) {
    if !is_json() && !is_quiet() {
        println!("  {line}");
    }
}
