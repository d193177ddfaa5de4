//! Integration tests for kdrive-api
//!
//! Uses wiremock to simulate the kDrive REST API and verifies the JSON
//! mapping, pagination parameters, error handling and mutations of
//! `KDriveApi`.


mod test_activities;
mod test_listing;
mod test_mutations;
