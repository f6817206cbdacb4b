// The shared repository contract against PostgreSQL
//
// Runs only when STUDYHUB_TEST_DATABASE_URL points at a disposable
// database; every table is truncated before each test.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

studyhub_core::conformance_tests!(optional: common::pg_harness());
