//! Unit test modules.

mod fit_export_test;
mod merge_test;
