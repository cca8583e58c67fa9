// Copyright 2026 Pomforge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pomforge: page-object locator generation for end-to-end suites.
//!
//! The library scans live pages for interactive elements, synthesizes a
//! robust locator for each one and writes Page-Object-Model files. It also
//! crawls same-origin sites, transpiles recorded browser scripts into
//! Gherkin features plus step definitions, and checks links and images
//! for breakage.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod dom;
pub mod error;
pub mod linkcheck;
pub mod locator;
pub mod pom;
pub mod renderer;
pub mod rest;
pub mod transpiler;

pub use error::PomforgeError;
