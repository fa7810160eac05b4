// Test modules for telesales-insights
//
// Each source module has a corresponding test file that focuses on
// behaviour rather than implementation details.

// Shared fixtures
pub mod helpers;




pub mod report;

// NOTE: HTTP round trips against a mock server live in tests/ (wiremock)
