//! Test-only helpers specific to this crate.
//!
//! Random instance generators (`sgen_unsat_formula`, `sat_formula`, `conditional_pigeon_hole`)
//! live in `jamsat_formula::test` and are reused from there.
pub mod io;
