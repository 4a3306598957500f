// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Small vocabulary types describing one HCA port.

use std::fmt::{Display, Formatter};

/// Whether a PCI function is a physical function or an SR-IOV virtual function.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    strum::Display,
    strum::EnumIs,
    strum::EnumString,
)]
pub enum FunctionKind {
    #[strum(serialize = "PF")]
    Physical,
    #[strum(serialize = "VF")]
    Virtual,
}

/// Logical state of an RDMA port as reported by `ports/<n>/state`.
///
/// The kernel reports this as `<code>: <NAME>`; only the name is kept.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum PortState {
    Down,
    Init,
    Armed,
    Active,
    ActiveDefer,
    /// Anything the kernel may add later.
    Other(String),
}

impl PortState {
    /// Parse the sysfs representation, with or without the numeric code prefix.
    #[must_use]
    pub fn from_sysfs(raw: &str) -> PortState {
        let name = match raw.trim().split_once(':') {
            Some((_, name)) => name.trim(),
            None => raw.trim(),
        };
        match name.to_ascii_lowercase().as_str() {
            "down" => PortState::Down,
            "init" => PortState::Init,
            "armed" => PortState::Armed,
            "active" | "actv" => PortState::Active,
            "active_defer" => PortState::ActiveDefer,
            other => PortState::Other(other.to_string()),
        }
    }
}

impl Display for PortState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PortState::Down => write!(f, "down"),
            PortState::Init => write!(f, "init"),
            PortState::Armed => write!(f, "armed"),
            PortState::Active => write!(f, "actv"),
            PortState::ActiveDefer => write!(f, "active_defer"),
            PortState::Other(other) => write!(f, "{other}"),
        }
    }
}

/// Link layer of an RDMA port.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum LinkLayer {
    Infiniband,
    Ethernet,
    Other(String),
}

impl LinkLayer {
    /// Parse the `ports/<n>/link_layer` text.
    #[must_use]
    pub fn from_sysfs(raw: &str) -> LinkLayer {
        match raw.trim() {
            "InfiniBand" | "IB" => LinkLayer::Infiniband,
            "Ethernet" | "Eth" => LinkLayer::Ethernet,
            other => LinkLayer::Other(other.to_string()),
        }
    }
}

impl Display for LinkLayer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkLayer::Infiniband => write!(f, "IB"),
            LinkLayer::Ethernet => write!(f, "Eth"),
            LinkLayer::Other(other) => write!(f, "{other}"),
        }
    }
}

/// Whether an IB port has its own subnet management interface (a physical HCA) or not (a virtual HCA).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum::Display, strum::EnumString)]
pub enum VirtualHca {
    #[strum(serialize = "Phys")]
    Physical,
    #[strum(serialize = "Virt")]
    Virtual,
}

/// Outcome of comparing a RoCE port's QoS settings against the lossless baseline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum::Display, strum::EnumIs, strum::EnumString)]
pub enum RoceStatus {
    Lossless,
    Lossy,
}
