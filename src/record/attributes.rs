//! record/attributes — VSS_VOLUME_SNAPSHOT_ATTRIBUTES and snapshot contexts.
//!
//! Both are stored as u32 in VssLocalInfo. Unknown bits are kept as-is and
//! only logged; rendering falls back to hex for them.

use bitflags::bitflags;
use log::debug;
use serde::{Serialize, Serializer};
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct VolumeSnapshotAttributes: u32 {
        const PERSISTENT            = 0x0000_0001;
        const NO_AUTO_RECOVERY      = 0x0000_0002;
        const CLIENT_ACCESSIBLE     = 0x0000_0004;
        const NO_AUTO_RELEASE       = 0x0000_0008;
        const NO_WRITERS            = 0x0000_0010;
        const TRANSPORTABLE         = 0x0000_0020;
        const NOT_SURFACED          = 0x0000_0040;
        const NOT_TRANSACTED        = 0x0000_0080;
        const HARDWARE_ASSISTED     = 0x0001_0000;
        const DIFFERENTIAL          = 0x0002_0000;
        const PLEX                  = 0x0004_0000;
        const IMPORTED              = 0x0008_0000;
        const EXPOSED_LOCALLY       = 0x0010_0000;
        const EXPOSED_REMOTELY      = 0x0020_0000;
        const AUTO_RECOVER          = 0x0040_0000;
        const ROLLBACK_RECOVERY     = 0x0080_0000;
        const DELAYED_POST_SNAPSHOT = 0x0100_0000;
        const TXF_RECOVERY          = 0x0200_0000;
        const FILE_SHARE            = 0x0400_0000;
    }
}

const ATTRIBUTE_NAMES: &[(VolumeSnapshotAttributes, &str)] = &[
    (VolumeSnapshotAttributes::PERSISTENT, "persistent"),
    (VolumeSnapshotAttributes::NO_AUTO_RECOVERY, "no_auto_recovery"),
    (VolumeSnapshotAttributes::CLIENT_ACCESSIBLE, "client_accessible"),
    (VolumeSnapshotAttributes::NO_AUTO_RELEASE, "no_auto_release"),
    (VolumeSnapshotAttributes::NO_WRITERS, "no_writers"),
    (VolumeSnapshotAttributes::TRANSPORTABLE, "transportable"),
    (VolumeSnapshotAttributes::NOT_SURFACED, "not_surfaced"),
    (VolumeSnapshotAttributes::NOT_TRANSACTED, "not_transacted"),
    (VolumeSnapshotAttributes::HARDWARE_ASSISTED, "hardware_assisted"),
    (VolumeSnapshotAttributes::DIFFERENTIAL, "differential"),
    (VolumeSnapshotAttributes::PLEX, "plex"),
    (VolumeSnapshotAttributes::IMPORTED, "imported"),
    (VolumeSnapshotAttributes::EXPOSED_LOCALLY, "exposed_locally"),
    (VolumeSnapshotAttributes::EXPOSED_REMOTELY, "exposed_remotely"),
    (VolumeSnapshotAttributes::AUTO_RECOVER, "auto_recover"),
    (VolumeSnapshotAttributes::ROLLBACK_RECOVERY, "rollback_recovery"),
    (VolumeSnapshotAttributes::DELAYED_POST_SNAPSHOT, "delayed_post_snapshot"),
    (VolumeSnapshotAttributes::TXF_RECOVERY, "txf_recovery"),
    (VolumeSnapshotAttributes::FILE_SHARE, "file_share"),
];

impl VolumeSnapshotAttributes {
    /// Keep every bit, logging the ones without a name.
    pub fn from_raw(raw: u32) -> Self {
        let attrs = Self::from_bits_retain(raw);
        if !attrs.has_unknown_bits() {
            return attrs;
        }
        debug!("VSS volume snapshot attributes carry unknown flag(s) in {:#x}", raw);
        attrs
    }

    pub fn has_unknown_bits(&self) -> bool {
        self.bits() & !Self::all().bits() != 0
    }
}

impl fmt::Display for VolumeSnapshotAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<none>");
        }
        if self.has_unknown_bits() {
            return write!(f, "{:#x}", self.bits());
        }
        let names: Vec<&str> = ATTRIBUTE_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

impl Serialize for VolumeSnapshotAttributes {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// VSS_SNAPSHOT_CONTEXT: a combination of attributes naming the kind of
/// snapshot that was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SnapshotContext(pub u32);

const CONTEXT_NAMES: &[(u32, &str)] = &[
    (0x0000_0000, "backup"),
    (0x0000_0010, "file_share_backup"),
    (0x0000_0019, "nas_rollback"),
    (0x0000_0009, "app_rollback"),
    (0x0000_001d, "client_accessible"),
    (0x0000_000d, "client_accessible_writers"),
    (0xffff_ffff, "all"),
];

impl SnapshotContext {
    pub fn from_raw(raw: u32) -> Self {
        let ctx = SnapshotContext(raw);
        if ctx.name().is_none() && VolumeSnapshotAttributes::from_bits_retain(raw).has_unknown_bits() {
            debug!("VSS snapshot context carries unknown flag(s) in {:#x}", raw);
        }
        ctx
    }

    pub fn name(&self) -> Option<&'static str> {
        CONTEXT_NAMES
            .iter()
            .find(|(v, _)| *v == self.0)
            .map(|(_, n)| *n)
    }

    pub fn attributes(&self) -> VolumeSnapshotAttributes {
        VolumeSnapshotAttributes::from_bits_retain(self.0)
    }
}

impl fmt::Display for SnapshotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(n) => f.write_str(n),
            None => fmt::Display::fmt(&self.attributes(), f),
        }
    }
}

impl Serialize for SnapshotContext {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
