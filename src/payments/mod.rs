pub mod amortization;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::records::{Loan, LoanScheduleItem};
use crate::types::{LoanId, ScheduleItemStatus};

pub use amortization::{generate_schedule, ScheduledInstallment};

/// payment submitted against one schedule item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoanPayment {
    pub loan_id: LoanId,
    pub payment_number: String,
    pub payment_date: NaiveDate,
    pub principal_amount: Money,
    pub interest_amount: Money,
    pub total_amount: Money,
    pub payment_method: String,
    pub transaction_reference: Option<String>,
    pub notes: Option<String>,
}

impl NewLoanPayment {
    /// payment that settles a schedule item exactly as planned
    pub fn for_item(
        item: &LoanScheduleItem,
        payment_number: impl Into<String>,
        payment_date: NaiveDate,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            loan_id: item.loan_id,
            payment_number: payment_number.into(),
            payment_date,
            principal_amount: item.principal_amount,
            interest_amount: item.interest_amount,
            total_amount: item.total_amount,
            payment_method: payment_method.into(),
            transaction_reference: None,
            notes: None,
        }
    }

    /// checks that need no ledger state
    pub fn validate_amounts(&self) -> Result<()> {
        if !self.total_amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: self.total_amount,
            });
        }

        for portion in [self.principal_amount, self.interest_amount] {
            if portion.is_negative() {
                return Err(LedgerError::InvalidAmount { amount: portion });
            }
        }

        if self.total_amount != self.principal_amount + self.interest_amount {
            return Err(LedgerError::AmountMismatch {
                total: self.total_amount,
                principal: self.principal_amount,
                interest: self.interest_amount,
            });
        }

        Ok(())
    }

    /// full validation against the locked loan and schedule item
    pub fn validate_against(&self, loan: &Loan, item: &LoanScheduleItem) -> Result<()> {
        self.validate_amounts()?;

        if self.principal_amount > loan.outstanding_amount {
            return Err(LedgerError::ExceedsOutstanding {
                outstanding: loan.outstanding_amount,
                requested: self.principal_amount,
            });
        }

        if item.loan_id != self.loan_id {
            return Err(LedgerError::MismatchedLoan {
                schedule_item_id: item.id,
                loan_id: self.loan_id,
            });
        }

        if item.status == ScheduleItemStatus::Paid {
            return Err(LedgerError::AlreadyPaid {
                schedule_item_id: item.id,
            });
        }

        Ok(())
    }
}
