//! Passport Scanner: batch passport ingestion server.
//!
//! Accepts passport images/PDFs, scans them through Google Document AI
//! under a bounded-concurrency batch scheduler, deduplicates by document
//! ID, normalizes the extracted fields into a fixed 14-column schema
//! (optionally enhanced by an LLM), and exports the result as CSV or XLSX.

pub mod address;
pub mod batch;
pub mod config;
pub mod country;
pub mod enhance;
pub mod export;
pub mod normalize;
pub mod scan;
pub mod server;
pub mod session;
