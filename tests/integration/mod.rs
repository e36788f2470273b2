//! Integration Tests Module
//!
//! End-to-end tests for the Verdict Engine: both investigation strategies,
//! session persistence and resume, the engine's idempotent entry point,
//! and the queue worker. All tools are scripted; no capability service is
//! contacted.

// Scripted tools and case fixtures
mod support;

// Fixed three-tier pipeline
mod pipeline_test;

// Adaptive agent loop
mod agent_test;

// Memory and SQLite session stores
mod session_store_test;

// Engine entry point and queue worker
mod engine_test;

// Store writes failing mid-investigation
mod store_failure_test;
