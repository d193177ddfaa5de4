//! kDrive Core - Domain model and ports for the local file-tree cache
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `File`, `FileActivity`, `UserDrive`, special folders
//! - **Sort semantics** - the 12 listing orders shared by every cached view
//! - **Port definitions** - Traits for adapters: `IDriveApi`, `IFileRepository`,
//!   `ILocalFileCache`, `IErrorReporter`
//! - **Configuration** - YAML-backed settings for cache, API, logging and telemetry
//!
//! # Architecture
//!
//! The domain module contains pure data and ordering rules with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`kdrive-cache`, `kdrive-api`, `kdrive-telemetry`), and the orchestration
//! living in `kdrive-sync` only talks to those traits.

pub mod config;
pub mod domain;
pub mod ports;
