// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for stepwatch.
//!
//! Tick errors bubble to the owning worker loop, which logs them and
//! proceeds to the next scheduled tick. Only configuration errors are fatal
//! to the process.

use thiserror::Error;

/// Errors surfaced by a registration or watch tick.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Tracking store operation failed.
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Workflow service call failed.
    #[error("workflow service error: {0}")]
    Api(#[from] crate::workflow::ApiError),

    /// Alert delivery failed.
    #[error("notification error: {0}")]
    Notify(#[from] crate::notify::NotifyError),

    /// The workflow service reported a status this service does not model.
    /// Always fatal to the tick: it means the status model is out of date.
    #[error("unrecognized execution status '{status}' for {execution_ref}")]
    UnrecognizedStatus {
        /// The execution whose status could not be classified.
        execution_ref: String,
        /// The raw status string the service returned.
        status: String,
    },
}

/// Result type using the stepwatch [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
