mod build_tests;
mod common;
mod modules_tests;
