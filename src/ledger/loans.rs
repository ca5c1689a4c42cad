use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::Ledger;
use crate::context::Context;
use crate::errors::{LedgerError, Result};
use crate::payments::generate_schedule;
use crate::records::{Loan, LoanPayment, LoanScheduleItem, NewLoan};
use crate::types::{CompanyId, LoanId, LoanStatus, PartyRole, ScheduleItemStatus};

impl Ledger {
    /// create a loan and its repayment schedule in one unit of work
    ///
    /// Fails with `SameParty`, `InvalidAmount`, `InvalidRate` or `InvalidTerm`
    /// before touching storage, and with `NotFound` when either company is
    /// unknown. On any failure nothing is persisted.
    #[instrument(
        name = "ledger.create_loan",
        skip(self, ctx, new_loan),
        fields(
            lender = %new_loan.lender_company_id,
            borrower = %new_loan.borrower_company_id,
            principal = %new_loan.terms.principal,
        ),
        err
    )]
    pub fn create_loan(&self, ctx: &Context, new_loan: NewLoan) -> Result<Loan> {
        let installments = new_loan
            .validate()
            .and_then(|_| generate_schedule(&new_loan.terms))
            .map_err(|err| {
                warn!(error = %err, "loan request rejected");
                err
            })?;

        let now = Utc::now();
        let loan_id = Uuid::new_v4();
        let prefix = &self.config.loan_number_prefix;

        let loan = self.db.unit_of_work(ctx, |s| {
            for party in [new_loan.lender_company_id, new_loan.borrower_company_id] {
                if !s.company_exists(party)? {
                    return Err(LedgerError::not_found("company", party));
                }
            }

            let loan_number = match new_loan.loan_number.trim() {
                "" => format!("{}-{:06}", prefix, s.highest_loan_sequence(prefix)? + 1),
                number => number.to_string(),
            };

            let loan = Loan {
                id: loan_id,
                loan_number,
                lender_company_id: new_loan.lender_company_id,
                borrower_company_id: new_loan.borrower_company_id,
                principal_amount: new_loan.terms.principal,
                outstanding_amount: new_loan.terms.principal,
                interest_rate: new_loan.terms.annual_rate,
                start_date: new_loan.terms.start_date,
                maturity_date: new_loan.terms.maturity_date,
                payment_frequency: new_loan.terms.payment_frequency,
                payment_day: new_loan.terms.payment_day,
                status: new_loan.status,
                collateral_details: new_loan.collateral_details.clone(),
                notes: new_loan.notes.clone(),
                created_at: now,
                updated_at: now,
            };
            s.insert_loan(&loan)?;

            for installment in &installments {
                s.insert_schedule_item(&LoanScheduleItem {
                    id: Uuid::new_v4(),
                    loan_id,
                    sequence: installment.sequence,
                    scheduled_date: installment.scheduled_date,
                    principal_amount: installment.principal_portion,
                    interest_amount: installment.interest_portion,
                    total_amount: installment.total,
                    status: ScheduleItemStatus::Pending,
                    actual_payment_id: None,
                    created_at: now,
                    updated_at: now,
                })?;
            }

            Ok(loan)
        })?;

        info!(
            loan_id = %loan.id,
            loan_number = %loan.loan_number,
            installments = installments.len(),
            "loan created"
        );
        Ok(loan)
    }

    #[instrument(name = "ledger.get_loan", skip(self, ctx), err)]
    pub fn get_loan(&self, ctx: &Context, loan_id: LoanId) -> Result<Loan> {
        self.db
            .snapshot(ctx, |s| s.find_loan(loan_id))?
            .ok_or_else(|| LedgerError::not_found("loan", loan_id))
    }

    /// installments of a loan by scheduled date
    #[instrument(name = "ledger.get_schedule", skip(self, ctx), err)]
    pub fn get_schedule(&self, ctx: &Context, loan_id: LoanId) -> Result<Vec<LoanScheduleItem>> {
        self.db.snapshot(ctx, |s| {
            if !s.loan_exists(loan_id)? {
                return Err(LedgerError::not_found("loan", loan_id));
            }
            s.schedule_for_loan(loan_id)
        })
    }

    /// loans a company lends, borrows or either, most recent first
    #[instrument(name = "ledger.list_loans_by_party", skip(self, ctx), err)]
    pub fn list_loans_by_party(
        &self,
        ctx: &Context,
        company_id: CompanyId,
        role: PartyRole,
    ) -> Result<Vec<Loan>> {
        self.db.snapshot(ctx, |s| s.loans_for_party(company_id, role))
    }

    /// overwrite a loan's status without checking the transition
    #[instrument(name = "ledger.update_status", skip(self, ctx), err)]
    pub fn update_status(&self, ctx: &Context, loan_id: LoanId, status: LoanStatus) -> Result<()> {
        let changed = self
            .db
            .unit_of_work(ctx, |s| s.set_loan_status(loan_id, status, Utc::now()))?;
        if changed == 0 {
            return Err(LedgerError::not_found("loan", loan_id));
        }

        info!(%loan_id, %status, "loan status updated");
        Ok(())
    }

    /// payments recorded against a loan by payment date
    #[instrument(name = "ledger.list_payments", skip(self, ctx), err)]
    pub fn list_payments(&self, ctx: &Context, loan_id: LoanId) -> Result<Vec<LoanPayment>> {
        self.db.snapshot(ctx, |s| {
            if !s.loan_exists(loan_id)? {
                return Err(LedgerError::not_found("loan", loan_id));
            }
            s.payments_for_loan(loan_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::ledger::fixtures::{active_loan, date, ledger, parties, standard_loan};
    use crate::records::NewCompany;
    use crate::types::PaymentFrequency;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_two_year_monthly_loan() {
        let ledger = ledger();
        let ctx = Context::background();
        let loan = active_loan(&ledger);

        assert_eq!(loan.outstanding_amount, Money::from_major(100_000));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.loan_number, "LN-000001");

        let schedule = ledger.get_schedule(&ctx, loan.id).unwrap();
        assert_eq!(schedule.len(), 24);

        let first = &schedule[0];
        assert_eq!(first.sequence, 1);
        assert_eq!(first.status, ScheduleItemStatus::Pending);
        assert_eq!(first.scheduled_date, date(2025, 2, 1));
        assert_eq!(first.interest_amount, Money::from(dec!(416.67)));
        assert_eq!(first.principal_amount, Money::from(dec!(3970.47)));
        assert_eq!(first.total_amount, Money::from(dec!(4387.14)));

        let last = schedule.last().unwrap();
        assert_eq!(last.scheduled_date, date(2027, 1, 1));

        let principal: Money = schedule.iter().map(|i| i.principal_amount).sum();
        assert_eq!(principal, loan.principal_amount);
        assert!(schedule
            .iter()
            .all(|i| i.total_amount == i.principal_amount + i.interest_amount));
        assert!(schedule
            .windows(2)
            .all(|w| w[0].scheduled_date <= w[1].scheduled_date));
    }

    #[test]
    fn test_stored_loan_matches_created() {
        let ledger = ledger();
        let ctx = Context::background();
        let loan = active_loan(&ledger);

        assert_eq!(ledger.get_loan(&ctx, loan.id).unwrap(), loan);
    }

    #[test]
    fn test_same_party_persists_nothing() {
        let ledger = ledger();
        let ctx = Context::background();
        let (lender, _) = parties(&ledger);

        let request = standard_loan(&lender, &lender).build().unwrap();
        let err = ledger.create_loan(&ctx, request).unwrap_err();

        assert!(matches!(err, LedgerError::SameParty { .. }));
        let loans = ledger
            .list_loans_by_party(&ctx, lender.id, PartyRole::Any)
            .unwrap();
        assert!(loans.is_empty());
    }

    #[test]
    fn test_invalid_terms_are_rejected() {
        let ledger = ledger();
        let ctx = Context::background();
        let (lender, borrower) = parties(&ledger);

        let zero = standard_loan(&lender, &borrower)
            .principal(Money::ZERO)
            .build()
            .unwrap();
        assert!(matches!(
            ledger.create_loan(&ctx, zero),
            Err(LedgerError::InvalidAmount { .. })
        ));

        let sub_cent = standard_loan(&lender, &borrower)
            .principal(Money::from(dec!(100.005)))
            .maturity_date(date(2025, 2, 1))
            .build()
            .unwrap();
        assert!(matches!(
            ledger.create_loan(&ctx, sub_cent),
            Err(LedgerError::InvalidAmount { .. })
        ));

        let negative_rate = standard_loan(&lender, &borrower)
            .rate(Rate::from_percent(dec!(-0.5)))
            .build()
            .unwrap();
        assert!(matches!(
            ledger.create_loan(&ctx, negative_rate),
            Err(LedgerError::InvalidRate { .. })
        ));

        let backwards = standard_loan(&lender, &borrower)
            .start_date(date(2027, 1, 1))
            .maturity_date(date(2025, 1, 1))
            .build()
            .unwrap();
        assert!(matches!(
            ledger.create_loan(&ctx, backwards),
            Err(LedgerError::InvalidTerm { .. })
        ));

        let same_month = standard_loan(&lender, &borrower)
            .start_date(date(2025, 1, 1))
            .maturity_date(date(2025, 1, 20))
            .build()
            .unwrap();
        assert!(matches!(
            ledger.create_loan(&ctx, same_month),
            Err(LedgerError::InvalidTerm { .. })
        ));

        assert!(ledger
            .list_loans_by_party(&ctx, lender.id, PartyRole::Any)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_party_is_not_found() {
        let ledger = ledger();
        let ctx = Context::background();
        let (lender, _) = parties(&ledger);

        let request = NewLoan::builder()
            .lender(lender.id)
            .borrower(Uuid::new_v4())
            .principal(Money::from_major(5_000))
            .start_date(date(2025, 1, 1))
            .maturity_date(date(2025, 7, 1))
            .build()
            .unwrap();

        assert!(matches!(
            ledger.create_loan(&ctx, request),
            Err(LedgerError::NotFound { entity: "company", .. })
        ));
    }

    #[test]
    fn test_duplicate_loan_number_conflicts() {
        let ledger = ledger();
        let ctx = Context::background();
        let (lender, borrower) = parties(&ledger);

        let first = standard_loan(&lender, &borrower)
            .loan_number("FAC-2025-01")
            .build()
            .unwrap();
        ledger.create_loan(&ctx, first.clone()).unwrap();

        assert!(matches!(
            ledger.create_loan(&ctx, first),
            Err(LedgerError::Conflict { .. })
        ));
    }

    #[test]
    fn test_derived_numbers_skip_numbers_already_taken() {
        let ledger = ledger();
        let ctx = Context::background();
        let (lender, borrower) = parties(&ledger);
        let create = |number: Option<&str>| {
            let mut builder = standard_loan(&lender, &borrower);
            if let Some(number) = number {
                builder = builder.loan_number(number);
            }
            ledger.create_loan(&ctx, builder.build().unwrap()).unwrap().loan_number
        };

        assert_eq!(create(Some("LN-000002")), "LN-000002");
        assert_eq!(create(Some("LN-BRIDGE")), "LN-BRIDGE");
        assert_eq!(create(Some("LNX-000009")), "LNX-000009");
        assert_eq!(create(None), "LN-000003");
        assert_eq!(create(None), "LN-000004");
    }

    #[test]
    fn test_quarterly_loan_with_payment_day() {
        let ledger = ledger();
        let ctx = Context::background();
        let (lender, borrower) = parties(&ledger);

        let request = standard_loan(&lender, &borrower)
            .frequency(PaymentFrequency::Quarterly)
            .payment_day(15)
            .collateral_details("fleet of delivery vans")
            .build()
            .unwrap();
        let loan = ledger.create_loan(&ctx, request).unwrap();
        assert_eq!(loan.payment_day, Some(15));
        assert_eq!(loan.collateral_details.as_deref(), Some("fleet of delivery vans"));

        let schedule = ledger.get_schedule(&ctx, loan.id).unwrap();
        assert_eq!(schedule.len(), 8);
        assert_eq!(schedule[0].scheduled_date, date(2025, 4, 15));
        assert_eq!(schedule.last().unwrap().scheduled_date, date(2027, 1, 1));
    }

    #[test]
    fn test_list_by_role_most_recent_first() {
        let ledger = ledger();
        let ctx = Context::background();
        let (a, b) = parties(&ledger);
        let c = ledger
            .create_company(&ctx, NewCompany::new("Third Party", "REG-C"))
            .unwrap();

        let a_lends = ledger
            .create_loan(&ctx, standard_loan(&a, &b).build().unwrap())
            .unwrap();
        let a_borrows = ledger
            .create_loan(&ctx, standard_loan(&c, &a).build().unwrap())
            .unwrap();

        let ids = |loans: Vec<Loan>| loans.into_iter().map(|l| l.id).collect::<Vec<_>>();

        assert_eq!(
            ids(ledger.list_loans_by_party(&ctx, a.id, PartyRole::Lender).unwrap()),
            vec![a_lends.id]
        );
        assert_eq!(
            ids(ledger.list_loans_by_party(&ctx, a.id, PartyRole::Borrower).unwrap()),
            vec![a_borrows.id]
        );
        assert_eq!(
            ids(ledger.list_loans_by_party(&ctx, a.id, PartyRole::Any).unwrap()),
            vec![a_borrows.id, a_lends.id]
        );
        assert!(ledger
            .list_loans_by_party(&ctx, Uuid::new_v4(), PartyRole::Any)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_status() {
        let ledger = ledger();
        let ctx = Context::background();
        let loan = active_loan(&ledger);

        ledger
            .update_status(&ctx, loan.id, LoanStatus::Defaulted)
            .unwrap();
        assert_eq!(ledger.get_loan(&ctx, loan.id).unwrap().status, LoanStatus::Defaulted);

        // any status may follow any other
        ledger.update_status(&ctx, loan.id, LoanStatus::Pending).unwrap();
        assert_eq!(ledger.get_loan(&ctx, loan.id).unwrap().status, LoanStatus::Pending);

        assert!(matches!(
            ledger.update_status(&ctx, Uuid::new_v4(), LoanStatus::Active),
            Err(LedgerError::NotFound { entity: "loan", .. })
        ));
    }

    #[test]
    fn test_reads_of_unknown_loan() {
        let ledger = ledger();
        let ctx = Context::background();
        let missing = Uuid::new_v4();

        assert!(matches!(ledger.get_loan(&ctx, missing), Err(LedgerError::NotFound { .. })));
        assert!(matches!(ledger.get_schedule(&ctx, missing), Err(LedgerError::NotFound { .. })));
        assert!(matches!(ledger.list_payments(&ctx, missing), Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn test_cancelled_create_persists_nothing() {
        let ledger = ledger();
        let (lender, borrower) = parties(&ledger);
        let ctx = Context::background();
        ctx.cancel_handle().cancel();

        let request = standard_loan(&lender, &borrower).build().unwrap();
        assert!(matches!(ledger.create_loan(&ctx, request), Err(LedgerError::Cancelled)));

        let fresh = Context::background();
        assert!(ledger
            .list_loans_by_party(&fresh, lender.id, PartyRole::Any)
            .unwrap()
            .is_empty());
    }
}
