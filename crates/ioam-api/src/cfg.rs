// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Export configuration as it crosses the API boundary.

use crate::CACHE_LINE_SIZE;
use crate::DEFAULT_EXPORT_SIZE;
use crate::MAX_EXPORT_SIZE;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The export configuration as supplied by an operator.
///
/// Nothing here is trusted until it has passed [`ExportCfg::validate`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ExportCfg {
    /// Whether packets reaching the export node are copied at all.
    pub enabled: bool,

    /// The maximum number of bytes of each packet to export. This must
    /// be a non-zero multiple of [`CACHE_LINE_SIZE`].
    pub export_size: usize,

    /// Whether the node produces a trace record for every packet.
    pub trace: bool,
}

impl Default for ExportCfg {
    fn default() -> Self {
        Self { enabled: true, export_size: DEFAULT_EXPORT_SIZE, trace: false }
    }
}

impl ExportCfg {
    /// Verify that this configuration can drive the bounded copy.
    pub fn validate(&self) -> Result<(), CfgError> {
        if self.export_size == 0 {
            return Err(CfgError::ZeroExportSize);
        }

        if self.export_size % CACHE_LINE_SIZE != 0 {
            return Err(CfgError::UnalignedExportSize(self.export_size));
        }

        if self.export_size > MAX_EXPORT_SIZE {
            return Err(CfgError::ExportSizeTooLarge(self.export_size));
        }

        Ok(())
    }

    /// The number of whole cache lines in a full-sized export.
    pub fn export_lines(&self) -> usize {
        self.export_size / CACHE_LINE_SIZE
    }
}

impl Display for ExportCfg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "enabled={} export_size={} trace={}",
            self.enabled, self.export_size, self.trace
        )
    }
}

/// Errors in an [`ExportCfg`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CfgError {
    #[error("export size must be non-zero")]
    ZeroExportSize,

    #[error("export size {0} is not a multiple of {line}", line = CACHE_LINE_SIZE)]
    UnalignedExportSize(usize),

    #[error("export size {0} exceeds the maximum of {max}", max = MAX_EXPORT_SIZE)]
    ExportSizeTooLarge(usize),
}
