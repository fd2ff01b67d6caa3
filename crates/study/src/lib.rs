// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Path-string entry points over a study tree.
//!
//! Settings choose the matrix store and the lock provider; a [`RawStudy`]
//! opened with them answers `get`/`save`/`delete` on paths such as
//! `input/areas/fr/ui`.

pub mod context;
pub mod error;
pub mod raw_study;
pub mod settings;

pub use context::StudyContext;
pub use error::{Result, StudyError};
pub use raw_study::RawStudy;
pub use settings::{LockSettings, Settings};
