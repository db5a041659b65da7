//! Probe results: one `ZoneReport` per zone cut, one `ChainReport` per input
//! domain. Both serialize to the JSON-Lines layout consumed by the
//! evaluation pipeline.

use crate::errors::ProbeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal classification of a zone or of a whole chain.
///
/// Every state except `Validated` is a demotion; a chain takes the state of
/// the first non-validated zone it encounters and never upgrades back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationState {
    Validated,
    Unsecured,
    Timeout,
    QueryError,
    MissingResource,
    WeirdStuffHappened,
    Other,
}

impl ValidationState {
    /// Total classification of the error taxonomy. Unrecognized kinds become
    /// `Other`; the caller is expected to keep the kind name in the reason.
    pub fn from_error(err: &ProbeError) -> Self {
        match err {
            ProbeError::Timeout(_) => Self::Timeout,
            ProbeError::Query(_) => Self::QueryError,
            ProbeError::MissingResource(_) => Self::MissingResource,
            ProbeError::InsecureDelegation(_) => Self::Unsecured,
            ProbeError::ShouldNotHappen(_) => Self::WeirdStuffHappened,
            ProbeError::EmptyRrset(_) | ProbeError::Protocol(_) | ProbeError::Io(_) => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "VALIDATED",
            Self::Unsecured => "UNSECURED",
            Self::Timeout => "TIMEOUT",
            Self::QueryError => "QUERY_ERROR",
            Self::MissingResource => "MISSING_RESOURCE",
            Self::WeirdStuffHappened => "WEIRD_STUFF_HAPPENED",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence gathered while validating one zone cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneReport {
    pub name: String,
    pub validation_state: ValidationState,
    pub reason: Option<String>,
    pub has_dnskey: bool,
    pub has_ds: bool,
    pub valid_dnskey: bool,
    pub valid_soa: bool,
    pub num_ksk: u32,
    pub num_zsk: u32,
    pub validated: bool,
    /// DS RRSIG verified under the parent's keys. Recorded for the chain
    /// logic but not part of the output line layout.
    #[serde(skip)]
    pub valid_ds: bool,
}

impl ZoneReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            validation_state: ValidationState::Validated,
            reason: None,
            has_dnskey: false,
            has_ds: false,
            valid_dnskey: false,
            valid_soa: false,
            num_ksk: 0,
            num_zsk: 0,
            validated: false,
            valid_ds: false,
        }
    }

    /// A zone counts as fully valid only when every link of its local chain
    /// held: DNSKEY present and self-signed, DS present, SOA signature good,
    /// and some DS digest matched some DNSKEY.
    pub fn is_fully_valid(&self) -> bool {
        self.has_dnskey && self.has_ds && self.valid_dnskey && self.valid_soa && self.validated
    }

    /// Convert a probe failure into the terminal state of this report.
    pub fn mark_error(&mut self, err: &ProbeError) {
        self.validation_state = ValidationState::from_error(err);
        self.reason = Some(match self.validation_state {
            ValidationState::Other => format!("{}: {}", err.kind_name(), err),
            _ => err.to_string(),
        });
    }

    pub fn mark_unsecured(&mut self, proof: impl Into<String>) {
        self.validation_state = ValidationState::Unsecured;
        self.reason = Some(proof.into());
    }
}

/// The outcome of `validate_chain` for one input domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    pub name: String,
    pub validation_state: ValidationState,
    pub reason: Option<String>,
    pub zones: Vec<ZoneReport>,
}

impl ChainReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            validation_state: ValidationState::Validated,
            reason: None,
            zones: Vec::new(),
        }
    }

    /// Take the state and reason of the first non-validated zone. Later
    /// demotions are ignored so the chain reports its first point of failure.
    pub fn demote(&mut self, zone: &ZoneReport) {
        if self.validation_state == ValidationState::Validated
            && zone.validation_state != ValidationState::Validated
        {
            self.validation_state = zone.validation_state;
            self.reason = zone.reason.clone();
        }
    }

    /// Terminal failure outside any single zone (discovery, bootstrap).
    pub fn mark_error(&mut self, err: &ProbeError) {
        if self.validation_state == ValidationState::Validated {
            self.validation_state = ValidationState::from_error(err);
            self.reason = Some(match self.validation_state {
                ValidationState::Other => format!("{}: {}", err.kind_name(), err),
                _ => err.to_string(),
            });
        }
    }

    pub fn is_validated(&self) -> bool {
        self.validation_state == ValidationState::Validated
    }
}

impl fmt::Display for ChainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Domain: {}", self.name)?;
        writeln!(f, "Result: {}", self.validation_state)?;
        writeln!(f, "Reason: {}", self.reason.as_deref().unwrap_or("-"))?;
        for zone in &self.zones {
            writeln!(
                f,
                "  {} {} dnskey={}/{} ds={} soa={} ksk={} zsk={} validated={}",
                zone.name,
                zone.validation_state,
                zone.has_dnskey,
                zone.valid_dnskey,
                zone.has_ds,
                zone.valid_soa,
                zone.num_ksk,
                zone.num_zsk,
                zone.validated,
            )?;
        }
        Ok(())
    }
}
