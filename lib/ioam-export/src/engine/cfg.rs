// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The configuration snapshot handed to the export loop.

use ioam_api::CfgError;
use ioam_api::ExportCfg;

/// An [`ExportCfg`] which has passed validation.
///
/// The export loop takes one of these per batch. It is `Copy` and
/// never changes once built, so every packet of a batch sees the same
/// settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ValidCfg {
    enabled: bool,
    export_size: usize,
    trace: bool,
}

impl ValidCfg {
    pub fn new(cfg: ExportCfg) -> Result<Self, CfgError> {
        cfg.validate()?;
        Ok(Self {
            enabled: cfg.enabled,
            export_size: cfg.export_size,
            trace: cfg.trace,
        })
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn export_size(&self) -> usize {
        self.export_size
    }

    #[inline]
    pub fn trace(&self) -> bool {
        self.trace
    }

    pub fn to_cfg(&self) -> ExportCfg {
        ExportCfg {
            enabled: self.enabled,
            export_size: self.export_size,
            trace: self.trace,
        }
    }
}

impl Default for ValidCfg {
    fn default() -> Self {
        let cfg = ExportCfg::default();
        Self {
            enabled: cfg.enabled,
            export_size: cfg.export_size,
            trace: cfg.trace,
        }
    }
}

impl TryFrom<ExportCfg> for ValidCfg {
    type Error = CfgError;

    fn try_from(cfg: ExportCfg) -> Result<Self, Self::Error> {
        Self::new(cfg)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ioam_api::DEFAULT_EXPORT_SIZE;

    #[test]
    fn default_is_valid() {
        let cfg = ValidCfg::default();
        assert_eq!(ValidCfg::new(ExportCfg::default()), Ok(cfg));
        assert!(cfg.enabled());
        assert!(!cfg.trace());
        assert_eq!(cfg.export_size(), DEFAULT_EXPORT_SIZE);
    }

    #[test]
    fn invalid_is_refused() {
        let cfg = ExportCfg { export_size: 100, ..Default::default() };
        assert_eq!(
            ValidCfg::try_from(cfg),
            Err(CfgError::UnalignedExportSize(100))
        );
    }
}
