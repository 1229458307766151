//! Integration tests for kiln-lib.

mod build_tests;
mod common;
mod modules_tests;
