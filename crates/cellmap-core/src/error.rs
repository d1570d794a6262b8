#![forbid(unsafe_code)]

//! Errors raised by the binding engine.
//!
//! # Failure Modes
//!
//! | Error | Category | Raised by |
//! |-------|----------|-----------|
//! | `NoMapper` | configuration | factory returned nothing for a node |
//! | `InvalidConfig` | configuration | contradictory `MapperConfig` |
//! | `AlreadyAttached` / `NotAttached` | lifecycle | binder attach/lookup calls |
//! | `UnknownMapper` / `UnknownTarget` | lifecycle | ids that are not (or no longer) live |
//! | `CounterUnderflow` | consistency | unbalanced counter release |
//! | `Inconsistent` | consistency | internal index/state mismatch |
//!
//! Lookup misses are not errors: providers return empty results instead.

use std::fmt;

use cellmap_model::NodeId;

use crate::mapper::MapperId;
use crate::target::TargetId;

/// Errors from mapping operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The binding factory produced no mapper for a required node.
    NoMapper { node: NodeId, kind: String },
    /// A mapper configuration combines options that cannot coexist.
    InvalidConfig { kind: String, reason: &'static str },
    /// The binder already has an attached root.
    AlreadyAttached,
    /// The binder has no attached root.
    NotAttached,
    /// The mapper id is not attached.
    UnknownMapper(MapperId),
    /// The target id does not exist.
    UnknownTarget(TargetId),
    /// A counter release would drive the counter below zero.
    CounterUnderflow {
        mapper: MapperId,
        counter: &'static str,
        value: i32,
        delta: i32,
    },
    /// Internal bookkeeping disagrees with the observed state.
    Inconsistent(String),
}

impl MappingError {
    /// Whether this is a configuration error (fatal at attach time).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoMapper { .. } | Self::InvalidConfig { .. })
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMapper { node, kind } => {
                write!(f, "no mapper for node {node} of kind '{kind}'")
            }
            Self::InvalidConfig { kind, reason } => {
                write!(f, "invalid mapper config for '{kind}': {reason}")
            }
            Self::AlreadyAttached => write!(f, "binder already has an attached root"),
            Self::NotAttached => write!(f, "binder has no attached root"),
            Self::UnknownMapper(id) => write!(f, "mapper {id} is not attached"),
            Self::UnknownTarget(id) => write!(f, "target {id} does not exist"),
            Self::CounterUnderflow {
                mapper,
                counter,
                value,
                delta,
            } => write!(
                f,
                "counter '{counter}' of mapper {mapper} would drop below zero ({value} {delta:+})"
            ),
            Self::Inconsistent(msg) => write!(f, "inconsistent mapping state: {msg}"),
        }
    }
}

impl std::error::Error for MappingError {}
