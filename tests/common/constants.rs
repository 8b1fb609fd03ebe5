//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, catalog names, etc.),
//! update only this file.
#![allow(dead_code)]

// ============================================================================
// Test User Credentials
// ============================================================================

/// Admin test user, seeded first
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASS: &str = "adminpass123";

/// Editor test user
pub const EDITOR_EMAIL: &str = "editor@example.com";
pub const EDITOR_PASS: &str = "editorpass123";

/// Viewer test user
pub const VIEWER_EMAIL: &str = "viewer@example.com";
pub const VIEWER_PASS: &str = "viewerpass123";

/// Secret the test server signs tokens with
pub const TEST_JWT_SECRET: &str = "e2e-test-secret";

// ============================================================================
// Test Catalog Metadata
// ============================================================================

pub const ARTIST_1_NAME: &str = "The Test Band";
pub const ARTIST_1_GRAMMY: i64 = 3;

pub const ARTIST_2_NAME: &str = "Jazz Ensemble";
pub const ARTIST_2_GRAMMY: i64 = 0;

/// By The Test Band
pub const ALBUM_1_NAME: &str = "First Album";
pub const ALBUM_1_YEAR: i64 = 2001;

/// By Jazz Ensemble
pub const ALBUM_2_NAME: &str = "Jazz Collection";
pub const ALBUM_2_YEAR: i64 = 1999;

/// Tracks 1-3 are on First Album, 4-5 on Jazz Collection
pub const TRACK_1_NAME: &str = "Opening Track";
pub const TRACK_2_NAME: &str = "Middle Track";
pub const TRACK_3_NAME: &str = "Closing Track";
pub const TRACK_4_NAME: &str = "Smooth Jazz";
pub const TRACK_5_NAME: &str = "Upbeat Jazz";

/// Duration of every seeded track, in seconds
pub const TRACK_DURATION: i64 = 180;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
