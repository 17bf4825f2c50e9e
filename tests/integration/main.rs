//! Integration tests for Site-Harvest

mod common;
mod crawl_tests;
mod fetch_tests;
mod sitemap_tests;
