//! Integration tests driving full ingestion runs against mock servers

mod common;
mod crawl_tests;
mod resume_tests;
