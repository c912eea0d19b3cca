//! Integration tests for Directory-Harvest
//!
//! These tests use wiremock to stand in for the directory site, the image
//! host and the prediction service.

mod assemble_tests;
mod common;
mod crawl_tests;
mod fetch_tests;
