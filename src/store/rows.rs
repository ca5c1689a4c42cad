use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::decimal::{Money, Rate};
use crate::records::{Company, Loan, LoanPayment, LoanScheduleItem};
use crate::types::{LoanStatus, PaymentFrequency, ScheduleItemStatus};

pub(crate) const COMPANY_COLUMNS: &str = "id, name, registration_number, tax_id, contact_person, \
     email, phone, address, is_active, created_at, updated_at";

pub(crate) const LOAN_COLUMNS: &str = "id, loan_number, lender_company_id, borrower_company_id, \
     principal_amount, outstanding_amount, interest_rate, start_date, maturity_date, \
     payment_frequency, payment_day, status, collateral_details, notes, created_at, updated_at";

pub(crate) const SCHEDULE_COLUMNS: &str = "id, loan_id, sequence, scheduled_date, \
     principal_amount, interest_amount, total_amount, status, actual_payment_id, \
     created_at, updated_at";

pub(crate) const PAYMENT_COLUMNS: &str = "id, loan_id, payment_number, payment_date, \
     principal_amount, interest_amount, total_amount, payment_method, transaction_reference, \
     notes, created_at";

// amounts are stored as exact decimal text, never as REAL

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_decimal().to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        parse_decimal(value).map(Money::from_decimal)
    }
}

/// rates are stored as annual percentages
impl ToSql for Rate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_percentage().to_string()))
    }
}

impl FromSql for Rate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        parse_decimal(value).map(Rate::from_percent)
    }
}

fn parse_decimal(value: ValueRef<'_>) -> FromSqlResult<Decimal> {
    Decimal::from_str(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
}

macro_rules! text_enum_sql {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    <$ty>::from_str(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

text_enum_sql!(LoanStatus, ScheduleItemStatus, PaymentFrequency);

pub(crate) fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get("id")?,
        name: row.get("name")?,
        registration_number: row.get("registration_number")?,
        tax_id: row.get("tax_id")?,
        contact_person: row.get("contact_person")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    Ok(Loan {
        id: row.get("id")?,
        loan_number: row.get("loan_number")?,
        lender_company_id: row.get("lender_company_id")?,
        borrower_company_id: row.get("borrower_company_id")?,
        principal_amount: row.get("principal_amount")?,
        outstanding_amount: row.get("outstanding_amount")?,
        interest_rate: row.get("interest_rate")?,
        start_date: row.get("start_date")?,
        maturity_date: row.get("maturity_date")?,
        payment_frequency: row.get("payment_frequency")?,
        payment_day: row.get("payment_day")?,
        status: row.get("status")?,
        collateral_details: row.get("collateral_details")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn schedule_item_from_row(row: &Row<'_>) -> rusqlite::Result<LoanScheduleItem> {
    Ok(LoanScheduleItem {
        id: row.get("id")?,
        loan_id: row.get("loan_id")?,
        sequence: row.get("sequence")?,
        scheduled_date: row.get("scheduled_date")?,
        principal_amount: row.get("principal_amount")?,
        interest_amount: row.get("interest_amount")?,
        total_amount: row.get("total_amount")?,
        status: row.get("status")?,
        actual_payment_id: row.get("actual_payment_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<LoanPayment> {
    Ok(LoanPayment {
        id: row.get("id")?,
        loan_id: row.get("loan_id")?,
        payment_number: row.get("payment_number")?,
        payment_date: row.get("payment_date")?,
        principal_amount: row.get("principal_amount")?,
        interest_amount: row.get("interest_amount")?,
        total_amount: row.get("total_amount")?,
        payment_method: row.get("payment_method")?,
        transaction_reference: row.get("transaction_reference")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}
