mod blocks_tests;
mod classify_tests;
mod common;
mod schema_tests;
