//! Crate-level tests and shared fixtures.


mod registry_loading;
