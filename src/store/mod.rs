//! SQLite persistence for the ledger.
//!
//! Only this module talks to the database. Ledger operations run their
//! statements through a [`Session`] handed out by [`Database::unit_of_work`]
//! (one `BEGIN IMMEDIATE` transaction, committed when the closure returns
//! `Ok`, rolled back otherwise) or by [`Database::snapshot`] (plain reads
//! outside any transaction).

mod rows;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::{EngineConfig, MAX_BUSY_TIMEOUT_MS};
use crate::context::Context;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::records::{Company, Loan, LoanPayment, LoanScheduleItem};
use crate::types::{
    CompanyId, LoanId, LoanStatus, PartyRole, PaymentId, ScheduleItemId, ScheduleItemStatus,
};

use rows::{
    company_from_row, loan_from_row, payment_from_row, schedule_item_from_row, COMPANY_COLUMNS,
    LOAN_COLUMNS, PAYMENT_COLUMNS, SCHEDULE_COLUMNS,
};

const SCHEMA: &str = include_str!("schema.sql");

/// handle to the ledger database
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        if busy_timeout.as_millis() > u128::from(MAX_BUSY_TIMEOUT_MS) {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("busy timeout of {:?} is too long", busy_timeout),
            });
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// open an in-memory database (used in tests)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        match &config.database_path {
            Some(path) => Self::open(path, Duration::from_millis(config.busy_timeout_ms)),
            None => Self::in_memory(),
        }
    }

    /// create tables and indexes that do not exist yet
    pub fn migrate(&self) -> Result<()> {
        self.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// run `work` inside one transaction holding the database write lock
    pub fn unit_of_work<T>(
        &self,
        ctx: &Context,
        work: impl FnOnce(&Session<'_>) -> Result<T>,
    ) -> Result<T> {
        ctx.check()?;
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let value = {
            let session = Session { conn: &tx, ctx };
            work(&session)?
        };

        // a cancellation seen after the last statement still aborts the commit
        ctx.check()?;
        tx.commit()?;
        Ok(value)
    }

    /// run unlocked reads outside any transaction
    pub fn snapshot<T>(
        &self,
        ctx: &Context,
        read: impl FnOnce(&Session<'_>) -> Result<T>,
    ) -> Result<T> {
        ctx.check()?;
        let conn = self.lock();
        let session = Session { conn: &conn, ctx };
        read(&session)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // a panic mid-transaction rolls back on unwind; the connection stays usable
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// statements available to one unit of work or snapshot
pub struct Session<'c> {
    conn: &'c Connection,
    ctx: &'c Context,
}

impl Session<'_> {
    // companies

    pub fn insert_company(&self, company: &Company) -> Result<()> {
        self.ctx.check()?;
        self.conn
            .execute(
                "INSERT INTO companies (id, name, registration_number, tax_id, contact_person, \
                 email, phone, address, is_active, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    company.id,
                    company.name,
                    company.registration_number,
                    company.tax_id,
                    company.contact_person,
                    company.email,
                    company.phone,
                    company.address,
                    company.is_active,
                    company.created_at,
                    company.updated_at,
                ],
            )
            .map_err(|e| {
                unique_violation(e, || {
                    format!(
                        "registration number {} already exists",
                        company.registration_number
                    )
                })
            })?;
        Ok(())
    }

    pub fn find_company(&self, id: CompanyId) -> Result<Option<Company>> {
        self.ctx.check()?;
        let company = self
            .conn
            .query_row(
                &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"),
                params![id],
                company_from_row,
            )
            .optional()?;
        Ok(company)
    }

    pub fn find_company_by_registration_number(&self, number: &str) -> Result<Option<Company>> {
        self.ctx.check()?;
        let company = self
            .conn
            .query_row(
                &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE registration_number = ?1"),
                params![number],
                company_from_row,
            )
            .optional()?;
        Ok(company)
    }

    pub fn company_exists(&self, id: CompanyId) -> Result<bool> {
        self.ctx.check()?;
        let found = self
            .conn
            .query_row("SELECT 1 FROM companies WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    // loans

    pub fn insert_loan(&self, loan: &Loan) -> Result<()> {
        self.ctx.check()?;
        self.conn
            .execute(
                "INSERT INTO loans (id, loan_number, lender_company_id, borrower_company_id, \
                 principal_amount, outstanding_amount, interest_rate, start_date, maturity_date, \
                 payment_frequency, payment_day, status, collateral_details, notes, \
                 created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    loan.id,
                    loan.loan_number,
                    loan.lender_company_id,
                    loan.borrower_company_id,
                    loan.principal_amount,
                    loan.outstanding_amount,
                    loan.interest_rate,
                    loan.start_date,
                    loan.maturity_date,
                    loan.payment_frequency,
                    loan.payment_day,
                    loan.status,
                    loan.collateral_details,
                    loan.notes,
                    loan.created_at,
                    loan.updated_at,
                ],
            )
            .map_err(|e| {
                unique_violation(e, || format!("loan number {} already exists", loan.loan_number))
            })?;
        Ok(())
    }

    pub fn find_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.ctx.check()?;
        let loan = self
            .conn
            .query_row(
                &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1"),
                params![id],
                loan_from_row,
            )
            .optional()?;
        Ok(loan)
    }

    /// load a loan for modification
    ///
    /// Only meaningful inside a unit of work, whose transaction already holds
    /// the write lock that serializes every writer touching this row.
    pub fn load_loan_for_update(&self, id: LoanId) -> Result<Loan> {
        self.find_loan(id)?
            .ok_or_else(|| LedgerError::not_found("loan", id))
    }

    pub fn loan_exists(&self, id: LoanId) -> Result<bool> {
        self.ctx.check()?;
        let found = self
            .conn
            .query_row("SELECT 1 FROM loans WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// highest `N` among loan numbers of the form `<prefix>-N`, or 0
    pub fn highest_loan_sequence(&self, prefix: &str) -> Result<u64> {
        self.ctx.check()?;
        let head = format!("{}-", prefix);
        let mut stmt = self
            .conn
            .prepare("SELECT loan_number FROM loans WHERE substr(loan_number, 1, length(?1)) = ?1")?;
        let numbers = stmt
            .query_map(params![head], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(numbers
            .iter()
            .filter_map(|number| number.strip_prefix(&head))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max()
            .unwrap_or(0))
    }

    /// loans a company takes part in, most recent first
    pub fn loans_for_party(&self, company_id: CompanyId, role: PartyRole) -> Result<Vec<Loan>> {
        self.ctx.check()?;
        let filter = match role {
            PartyRole::Lender => "lender_company_id = ?1",
            PartyRole::Borrower => "borrower_company_id = ?1",
            PartyRole::Any => "lender_company_id = ?1 OR borrower_company_id = ?1",
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE {filter} ORDER BY created_at DESC, rowid DESC"
        ))?;
        let loans = stmt
            .query_map(params![company_id], loan_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(loans)
    }

    pub fn set_outstanding(&self, id: LoanId, outstanding: Money, now: DateTime<Utc>) -> Result<()> {
        self.ctx.check()?;
        self.conn.execute(
            "UPDATE loans SET outstanding_amount = ?1, updated_at = ?2 WHERE id = ?3",
            params![outstanding, now, id],
        )?;
        Ok(())
    }

    /// overwrite a loan's status; returns the number of loans changed
    pub fn set_loan_status(&self, id: LoanId, status: LoanStatus, now: DateTime<Utc>) -> Result<usize> {
        self.ctx.check()?;
        let changed = self.conn.execute(
            "UPDATE loans SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, now, id],
        )?;
        Ok(changed)
    }

    /// default every active loan holding an overdue installment dated before `cutoff`
    pub fn default_lapsed_loans(&self, cutoff: NaiveDate, now: DateTime<Utc>) -> Result<usize> {
        self.ctx.check()?;
        let changed = self.conn.execute(
            "UPDATE loans SET status = ?1, updated_at = ?2 \
             WHERE status = ?3 AND EXISTS ( \
                 SELECT 1 FROM loan_schedule_items si \
                 WHERE si.loan_id = loans.id AND si.status = ?4 AND si.scheduled_date < ?5)",
            params![
                LoanStatus::Defaulted,
                now,
                LoanStatus::Active,
                ScheduleItemStatus::Overdue,
                cutoff,
            ],
        )?;
        Ok(changed)
    }

    // schedule items

    pub fn insert_schedule_item(&self, item: &LoanScheduleItem) -> Result<()> {
        self.ctx.check()?;
        self.conn.execute(
            "INSERT INTO loan_schedule_items (id, loan_id, sequence, scheduled_date, \
             principal_amount, interest_amount, total_amount, status, actual_payment_id, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.id,
                item.loan_id,
                item.sequence,
                item.scheduled_date,
                item.principal_amount,
                item.interest_amount,
                item.total_amount,
                item.status,
                item.actual_payment_id,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    /// load a schedule item for modification; see [`Session::load_loan_for_update`]
    pub fn load_schedule_item_for_update(&self, id: ScheduleItemId) -> Result<LoanScheduleItem> {
        self.ctx.check()?;
        self.conn
            .query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM loan_schedule_items WHERE id = ?1"),
                params![id],
                schedule_item_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("schedule item", id))
    }

    /// a loan's installments by scheduled date
    pub fn schedule_for_loan(&self, loan_id: LoanId) -> Result<Vec<LoanScheduleItem>> {
        self.ctx.check()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM loan_schedule_items \
             WHERE loan_id = ?1 ORDER BY scheduled_date, sequence"
        ))?;
        let items = stmt
            .query_map(params![loan_id], schedule_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn mark_item_paid(
        &self,
        id: ScheduleItemId,
        payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ctx.check()?;
        self.conn.execute(
            "UPDATE loan_schedule_items SET status = ?1, actual_payment_id = ?2, updated_at = ?3 \
             WHERE id = ?4",
            params![ScheduleItemStatus::Paid, payment_id, now, id],
        )?;
        Ok(())
    }

    /// flag pending installments dated before `today`; returns how many changed
    pub fn mark_overdue_items(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<usize> {
        self.ctx.check()?;
        let changed = self.conn.execute(
            "UPDATE loan_schedule_items SET status = ?1, updated_at = ?2 \
             WHERE status = ?3 AND scheduled_date < ?4",
            params![
                ScheduleItemStatus::Overdue,
                now,
                ScheduleItemStatus::Pending,
                today,
            ],
        )?;
        Ok(changed)
    }

    // payments

    pub fn insert_payment(&self, payment: &LoanPayment) -> Result<()> {
        self.ctx.check()?;
        self.conn.execute(
            "INSERT INTO loan_payments (id, loan_id, payment_number, payment_date, \
             principal_amount, interest_amount, total_amount, payment_method, \
             transaction_reference, notes, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                payment.id,
                payment.loan_id,
                payment.payment_number,
                payment.payment_date,
                payment.principal_amount,
                payment.interest_amount,
                payment.total_amount,
                payment.payment_method,
                payment.transaction_reference,
                payment.notes,
                payment.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<LoanPayment>> {
        self.ctx.check()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM loan_payments \
             WHERE loan_id = ?1 ORDER BY payment_date, rowid"
        ))?;
        let payments = stmt
            .query_map(params![loan_id], payment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(payments)
    }
}

/// turn a UNIQUE constraint failure into a `Conflict`
fn unique_violation(err: rusqlite::Error, message: impl FnOnce() -> String) -> LedgerError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            LedgerError::Conflict { message: message() }
        }
        _ => LedgerError::from(err),
    }
}
