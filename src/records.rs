use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{
    CompanyId, LoanId, LoanStatus, PaymentFrequency, PaymentId, ScheduleItemId,
    ScheduleItemStatus,
};

/// lender or borrower party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub registration_number: String,
    pub tax_id: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// company registration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub registration_number: String,
    pub tax_id: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
}

impl NewCompany {
    /// active company with no contact details
    pub fn new(name: impl Into<String>, registration_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration_number: registration_number.into(),
            tax_id: None,
            contact_person: None,
            email: None,
            phone: None,
            address: None,
            is_active: true,
        }
    }
}

/// terms that drive schedule generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate: Rate,
    pub start_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub payment_frequency: PaymentFrequency,
    /// preferred day-of-month for installments; `None` keeps the start date's day
    pub payment_day: Option<u32>,
}

impl LoanTerms {
    /// checks applied before any write
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() || !self.principal.is_whole_cents() {
            return Err(LedgerError::InvalidAmount {
                amount: self.principal,
            });
        }

        if self.annual_rate.is_negative() {
            return Err(LedgerError::InvalidRate {
                rate: self.annual_rate,
            });
        }

        if self.start_date >= self.maturity_date {
            return Err(LedgerError::InvalidTerm {
                message: format!(
                    "start date {} must be before maturity date {}",
                    self.start_date, self.maturity_date
                ),
            });
        }

        if let Some(day) = self.payment_day {
            if day > 31 {
                return Err(LedgerError::InvalidTerm {
                    message: format!("payment day {} is not a day of the month", day),
                });
            }
        }

        Ok(())
    }
}

/// agreement between a lender and a borrower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub loan_number: String,
    pub lender_company_id: CompanyId,
    pub borrower_company_id: CompanyId,
    pub principal_amount: Money,
    pub outstanding_amount: Money,
    pub interest_rate: Rate,
    pub start_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub payment_frequency: PaymentFrequency,
    pub payment_day: Option<u32>,
    pub status: LoanStatus,
    pub collateral_details: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms {
            principal: self.principal_amount,
            annual_rate: self.interest_rate,
            start_date: self.start_date,
            maturity_date: self.maturity_date,
            payment_frequency: self.payment_frequency,
            payment_day: self.payment_day,
        }
    }

    pub fn is_repaid(&self) -> bool {
        !self.outstanding_amount.is_positive()
    }
}

/// loan creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    /// human-readable number; left empty the ledger derives one
    pub loan_number: String,
    pub lender_company_id: CompanyId,
    pub borrower_company_id: CompanyId,
    pub terms: LoanTerms,
    pub status: LoanStatus,
    pub collateral_details: Option<String>,
    pub notes: Option<String>,
}

impl NewLoan {
    pub fn builder() -> NewLoanBuilder {
        NewLoanBuilder::new()
    }

    /// checks applied before any write
    pub fn validate(&self) -> Result<()> {
        if self.lender_company_id == self.borrower_company_id {
            return Err(LedgerError::SameParty {
                company_id: self.lender_company_id,
            });
        }
        self.terms.validate()
    }
}

/// builder for loan creation requests
#[derive(Debug, Default)]
pub struct NewLoanBuilder {
    loan_number: Option<String>,
    lender: Option<CompanyId>,
    borrower: Option<CompanyId>,
    principal: Option<Money>,
    rate: Option<Rate>,
    start_date: Option<NaiveDate>,
    maturity_date: Option<NaiveDate>,
    frequency: Option<PaymentFrequency>,
    payment_day: Option<u32>,
    status: Option<LoanStatus>,
    collateral_details: Option<String>,
    notes: Option<String>,
}

impl NewLoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loan_number(mut self, number: impl Into<String>) -> Self {
        self.loan_number = Some(number.into());
        self
    }

    pub fn lender(mut self, id: CompanyId) -> Self {
        self.lender = Some(id);
        self
    }

    pub fn borrower(mut self, id: CompanyId) -> Self {
        self.borrower = Some(id);
        self
    }

    pub fn principal(mut self, amount: Money) -> Self {
        self.principal = Some(amount);
        self
    }

    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn maturity_date(mut self, date: NaiveDate) -> Self {
        self.maturity_date = Some(date);
        self
    }

    pub fn frequency(mut self, frequency: PaymentFrequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// a day of 0 means no preference
    pub fn payment_day(mut self, day: u32) -> Self {
        self.payment_day = (day > 0).then_some(day);
        self
    }

    pub fn status(mut self, status: LoanStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn collateral_details(mut self, details: impl Into<String>) -> Self {
        self.collateral_details = Some(details.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn build(self) -> Result<NewLoan> {
        let missing = |field: &str| LedgerError::InvalidConfiguration {
            message: format!("{} is required", field),
        };

        Ok(NewLoan {
            loan_number: self.loan_number.unwrap_or_default(),
            lender_company_id: self.lender.ok_or_else(|| missing("lender"))?,
            borrower_company_id: self.borrower.ok_or_else(|| missing("borrower"))?,
            terms: LoanTerms {
                principal: self.principal.ok_or_else(|| missing("principal"))?,
                annual_rate: self.rate.unwrap_or(Rate::ZERO),
                start_date: self.start_date.ok_or_else(|| missing("start date"))?,
                maturity_date: self.maturity_date.ok_or_else(|| missing("maturity date"))?,
                payment_frequency: self.frequency.unwrap_or(PaymentFrequency::Monthly),
                payment_day: self.payment_day,
            },
            status: self.status.unwrap_or(LoanStatus::Pending),
            collateral_details: self.collateral_details,
            notes: self.notes,
        })
    }
}

/// one planned installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanScheduleItem {
    pub id: ScheduleItemId,
    pub loan_id: LoanId,
    /// 1-based installment number
    pub sequence: u32,
    pub scheduled_date: NaiveDate,
    pub principal_amount: Money,
    pub interest_amount: Money,
    pub total_amount: Money,
    pub status: ScheduleItemStatus,
    pub actual_payment_id: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// settled payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub payment_number: String,
    pub payment_date: NaiveDate,
    pub principal_amount: Money,
    pub interest_amount: Money,
    pub total_amount: Money,
    pub payment_method: String,
    pub transaction_reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
