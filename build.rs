//! Build script that rebuilds the crate when SQL migrations change.
//!
//! `embed_migrations!` bakes the contents of `migrations/` into the binary,
//! and Cargo does not track files read by proc macros, so the directory is
//! watched explicitly.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-changed=build.rs");
}
