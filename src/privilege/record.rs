//! Privilege records: identities, capability sets, label, sandbox.

use std::fmt;

/// Administrative identity.
pub const ROOT_ID: u32 = 0;

/// Capabilities that matter to escalation, with their kernel bit numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Capability {
    DacOverride = 1,
    DacReadSearch = 2,
    Setgid = 6,
    Setuid = 7,
    NetAdmin = 12,
    SysModule = 16,
    SysPtrace = 19,
    SysAdmin = 21,
}

impl Capability {
    pub fn bit(self) -> u64 {
        1 << (self as u8)
    }
}

/// Capabilities granted by escalation, added to the effective, permitted
/// and bounding sets.
pub const ESCALATION_CAPS: [Capability; 8] = [
    Capability::SysAdmin,
    Capability::DacOverride,
    Capability::Setuid,
    Capability::Setgid,
    Capability::NetAdmin,
    Capability::SysPtrace,
    Capability::SysModule,
    Capability::DacReadSearch,
];

/// A 64-bit capability mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CapabilitySet(u64);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    #[must_use]
    pub fn with_all(self, caps: &[Capability]) -> Self {
        Self(caps.iter().fold(self.0, |acc, cap| acc | cap.bit()))
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Real, effective, saved and filesystem forms of one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSet {
    pub real: u32,
    pub effective: u32,
    pub saved: u32,
    pub fs: u32,
}

impl IdSet {
    /// All four forms set to `id`.
    pub fn uniform(id: u32) -> Self {
        Self {
            real: id,
            effective: id,
            saved: id,
            fs: id,
        }
    }
}

impl fmt::Display for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.real, self.effective, self.saved, self.fs)
    }
}

/// Syscall filter state attached to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxMode {
    Filtered,
    Disabled,
}

impl SandboxMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SandboxMode::Filtered => "filtered",
            SandboxMode::Disabled => "disabled",
        }
    }
}

/// Full credential state of one caller.
///
/// Records are replaced whole; `generation` increases on every commit and
/// lets the store detect a concurrent change between snapshot and commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeRecord {
    pub uid: IdSet,
    pub gid: IdSet,
    pub cap_effective: CapabilitySet,
    pub cap_permitted: CapabilitySet,
    pub cap_bounding: CapabilitySet,
    pub securebits: u32,
    pub label: String,
    pub label_sid: Option<u32>,
    pub sandbox: SandboxMode,
    pub generation: u64,
}

impl PrivilegeRecord {
    /// Record of an ordinary process running as `uid`/`gid`.
    pub fn unprivileged(uid: u32, gid: u32, label: impl Into<String>) -> Self {
        Self {
            uid: IdSet::uniform(uid),
            gid: IdSet::uniform(gid),
            cap_effective: CapabilitySet::EMPTY,
            cap_permitted: CapabilitySet::EMPTY,
            cap_bounding: CapabilitySet::EMPTY,
            securebits: 0,
            label: label.into(),
            label_sid: None,
            sandbox: SandboxMode::Filtered,
            generation: 0,
        }
    }

    pub fn is_administrative(&self) -> bool {
        self.uid.effective == ROOT_ID
    }

    /// Human-readable dump, one field per line.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("uid={}", self.uid),
            format!("gid={}", self.gid),
            format!("cap_eff={}", self.cap_effective),
            format!("cap_prm={}", self.cap_permitted),
            format!("cap_bnd={}", self.cap_bounding),
            format!("securebits={:#x}", self.securebits),
            format!("label={}", self.label),
            format!("sandbox={}", self.sandbox.as_str()),
        ]
    }
}
