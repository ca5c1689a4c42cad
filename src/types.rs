use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;

pub type CompanyId = Uuid;
pub type LoanId = Uuid;
pub type ScheduleItemId = Uuid;
pub type PaymentId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// agreed but not yet running
    Pending,
    /// running and expected to be repaid on schedule
    Active,
    /// outstanding principal repaid in full
    Completed,
    /// installments lapsed past the default threshold
    Defaulted,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Pending,
        LoanStatus::Active,
        LoanStatus::Completed,
        LoanStatus::Defaulted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Active => "Active",
            LoanStatus::Completed => "Completed",
            LoanStatus::Defaulted => "Defaulted",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoanStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// schedule item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleItemStatus {
    Pending,
    Paid,
    Overdue,
}

impl ScheduleItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleItemStatus::Pending => "Pending",
            ScheduleItemStatus::Paid => "Paid",
            ScheduleItemStatus::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for ScheduleItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleItemStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ScheduleItemStatus::Pending),
            "Paid" => Ok(ScheduleItemStatus::Paid),
            "Overdue" => Ok(ScheduleItemStatus::Overdue),
            other => Err(LedgerError::InvalidStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// calendar interval between installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentFrequency {
    Monthly,
    Quarterly,
    #[serde(rename = "Semi-Annually")]
    SemiAnnually,
    Annually,
}

impl PaymentFrequency {
    /// period length in months
    pub fn period_months(&self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 1,
            PaymentFrequency::Quarterly => 3,
            PaymentFrequency::SemiAnnually => 6,
            PaymentFrequency::Annually => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFrequency::Monthly => "Monthly",
            PaymentFrequency::Quarterly => "Quarterly",
            PaymentFrequency::SemiAnnually => "Semi-Annually",
            PaymentFrequency::Annually => "Annually",
        }
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentFrequency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Monthly" => Ok(PaymentFrequency::Monthly),
            "Quarterly" => Ok(PaymentFrequency::Quarterly),
            "Semi-Annually" => Ok(PaymentFrequency::SemiAnnually),
            "Annually" => Ok(PaymentFrequency::Annually),
            other => Err(LedgerError::UnsupportedFrequency {
                value: other.to_string(),
            }),
        }
    }
}

/// side of a loan a company is looked up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Lender,
    Borrower,
    Any,
}

impl FromStr for PartyRole {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lender" => Ok(PartyRole::Lender),
            "borrower" => Ok(PartyRole::Borrower),
            "any" => Ok(PartyRole::Any),
            other => Err(LedgerError::InvalidRole {
                value: other.to_string(),
            }),
        }
    }
}
