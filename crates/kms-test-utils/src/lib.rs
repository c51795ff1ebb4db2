// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for kms integration tests.
//!
//! Provides scripted stand-ins for every collaborator the provisioning
//! pipeline talks to, plus a harness that points all configured paths into
//! a temporary directory.
//!
//! # Components
//!
//! - [`ScriptedSurface`] - Prompt surface answering from a queue
//! - [`FakeProbe`] - Process probe with a fixed user and parent
//! - [`StaticShells`] - In-memory shell registry, optionally unreadable
//! - [`RecordingGateway`] - Vault gateway that records `create` calls
//! - [`TestHarness`] - Temporary directory with a matching configuration

pub mod harness;
pub mod mocks;

pub use harness::TestHarness;
pub use mocks::{FakeProbe, RecordingGateway, RecordedCreate, ScriptedSurface, StaticShells};
