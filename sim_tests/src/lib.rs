//! Integration test crate. See `tests/` for the actual suites.
