// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Application identity profile records and the catalog build pipeline.
//!
//! This crate defines the canonical schema for one application entry (a
//! *profile record*), loads the full set of on-disk records into an
//! immutable snapshot, validates the snapshot against the catalog
//! invariants, and merges validated records into the consolidated bundle
//! artifact consumed by the monitoring agent.

mod bundle;
mod error;
mod record;
mod snapshot;
mod validate;

pub use {
    bundle::{build_bundle, ConsolidatedBundle, BUNDLE_FORMAT_VERSION},
    error::CatalogError,
    record::{
        is_valid_id, normalize_id, AiStatus, LinuxSignature, MacosSignature, ProfileRecord,
        RecordMetadata, Signatures, WindowsSignature,
    },
    snapshot::{Snapshot, SnapshotEntry},
    validate::{validate_snapshot, CheckKind, ValidationReport, Violation},
};
