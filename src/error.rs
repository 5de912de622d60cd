use crate::config::ConfigError;
use crate::core::currency::CurrencyCode;
use crate::core::document::DocumentRef;
use crate::fx::rate::RateError;
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T, E = SettlementError> = std::result::Result<T, E>;

/// What an over-allocation ran out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationLimit {
    /// The target obligation's unallocated balance.
    Obligation(Uuid),
    /// The payment's unallocated amount.
    Payment(Uuid),
    /// The credit obligation's available balance.
    Credit(Uuid),
}

impl fmt::Display for AllocationLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationLimit::Obligation(id) => write!(f, "obligation {id} balance"),
            AllocationLimit::Payment(id) => write!(f, "payment {id} unallocated amount"),
            AllocationLimit::Credit(id) => write!(f, "credit {id} available balance"),
        }
    }
}

/// Errors returned by settlement commands.
///
/// Every variant is a recoverable, caller-visible condition. The engine never
/// degrades an invalid command into a partial result.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("invalid payment term: {reason}")]
    InvalidTerm { reason: String },

    #[error("over-allocation: requested {requested} exceeds {limit} of {available}")]
    OverAllocation {
        limit: AllocationLimit,
        requested: i64,
        available: i64,
    },

    #[error("no approved exchange rate for {from} -> {to} as of {as_of}")]
    RateUnavailable {
        from: CurrencyCode,
        to: CurrencyCode,
        as_of: NaiveDate,
    },

    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("obligation {obligation} is already waived")]
    AlreadyWaived { obligation: Uuid },

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("invalid allocation: {reason}")]
    InvalidAllocation { reason: String },

    #[error("invalid currency: {reason}")]
    InvalidCurrency { reason: String },

    #[error("allocation already exists for payment {payment} -> obligation {obligation}")]
    DuplicateAllocation {
        payment: Uuid,
        obligation: Uuid,
        credit: Option<Uuid>,
    },

    #[error("unknown obligation {0}")]
    UnknownObligation(Uuid),

    #[error("unknown payment {0}")]
    UnknownPayment(Uuid),

    #[error("unknown allocation {0}")]
    UnknownAllocation(Uuid),

    #[error("unknown document {0}")]
    UnknownDocument(DocumentRef),

    #[error("unknown currency {code}")]
    UnknownCurrency { code: CurrencyCode },

    #[error("document {0} is already registered")]
    DocumentExists(DocumentRef),

    #[error("document {0} already has a payment schedule")]
    ScheduleExists(DocumentRef),

    #[error("an approving actor is required")]
    MissingActor,

    #[error("a rejection reason is required")]
    MissingReason,

    #[error(transparent)]
    Rate(RateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<RateError> for SettlementError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::Unavailable { from, to, as_of } => {
                SettlementError::RateUnavailable { from, to, as_of }
            }
            other => SettlementError::Rate(other),
        }
    }
}

/// Coarse classification for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidTerm,
    OverAllocation,
    RateUnavailable,
    InvalidTransition,
    AlreadyWaived,
    NotFound,
    Conflict,
    InvalidInput,
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettlementError::InvalidTerm { .. } => ErrorKind::InvalidTerm,
            SettlementError::OverAllocation { .. } => ErrorKind::OverAllocation,
            SettlementError::RateUnavailable { .. } => ErrorKind::RateUnavailable,
            SettlementError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            SettlementError::Rate(RateError::AlreadyApproved(_)) => ErrorKind::InvalidTransition,
            SettlementError::AlreadyWaived { .. } => ErrorKind::AlreadyWaived,
            SettlementError::UnknownObligation(_)
            | SettlementError::UnknownPayment(_)
            | SettlementError::UnknownAllocation(_)
            | SettlementError::UnknownDocument(_)
            | SettlementError::UnknownCurrency { .. }
            | SettlementError::Rate(RateError::UnknownRate(_)) => ErrorKind::NotFound,
            SettlementError::DuplicateAllocation { .. }
            | SettlementError::DocumentExists(_)
            | SettlementError::ScheduleExists(_) => ErrorKind::Conflict,
            SettlementError::InvalidAmount { .. }
            | SettlementError::InvalidAllocation { .. }
            | SettlementError::InvalidCurrency { .. }
            | SettlementError::MissingActor
            | SettlementError::MissingReason
            | SettlementError::Rate(_)
            | SettlementError::Config(_) => ErrorKind::InvalidInput,
        }
    }
}
