//! Unit and integration tests for sqlhandle
//!
//! This module organizes all tests into logical submodules that correspond to
//! the main library modules.

mod connection_tests;
mod proptest_tests;
