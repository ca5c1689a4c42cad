use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::{add_months, months_between, set_day_of_month};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::records::LoanTerms;

/// installment produced by the schedule generator, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub sequence: u32,
    pub scheduled_date: NaiveDate,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub total: Money,
}

/// generate the amortization schedule for a set of loan terms
///
/// The level payment is computed at month granularity over the whole term and
/// scaled by the period length. Interest for each installment accrues on the
/// remaining principal for the whole months elapsed since the previous date.
/// The final installment clears whatever principal remains and falls on the
/// maturity date. Portions are rounded half-up to cents and every total is
/// exactly `principal_portion + interest_portion`.
pub fn generate_schedule(terms: &LoanTerms) -> Result<Vec<ScheduledInstallment>> {
    let term = months_between(terms.start_date, terms.maturity_date);
    if term <= 0 {
        return Err(LedgerError::InvalidTerm {
            message: format!(
                "no whole months between {} and {}",
                terms.start_date, terms.maturity_date
            ),
        });
    }
    let term = term as u32;

    let period = terms.payment_frequency.period_months();
    let num_payments = term.div_ceil(period);

    let monthly_rate = terms.annual_rate.monthly_rate().as_decimal();
    let periodic_payment =
        level_payment(terms.principal.as_decimal(), monthly_rate, term) * Decimal::from(period);

    let mut installments = Vec::with_capacity(num_payments as usize);
    let mut remaining = terms.principal;
    let mut current_date = terms.start_date;

    for sequence in 1..=num_payments {
        let mut payment_date = add_months(current_date, period).ok_or_else(|| {
            LedgerError::InvalidTerm {
                message: format!("payment date after {} is out of range", current_date),
            }
        })?;

        if let Some(day) = terms.payment_day {
            payment_date = set_day_of_month(payment_date, day);
        }

        let mut is_final = sequence == num_payments;
        if is_final || payment_date > terms.maturity_date {
            payment_date = terms.maturity_date;
            is_final = true;
        }

        let elapsed = months_between(current_date, payment_date).max(0);
        let interest = remaining.as_decimal() * monthly_rate * Decimal::from(elapsed);

        let principal_portion = if is_final {
            remaining.round_cents()
        } else {
            let due = (periodic_payment - interest).max(Decimal::ZERO);
            Money::from_decimal(due).round_cents().min(remaining)
        };
        let interest_portion = Money::from_decimal(interest).round_cents();

        remaining -= principal_portion;

        // the installment that clears the balance closes the schedule at maturity
        let clears_balance = !remaining.is_positive();
        if clears_balance {
            payment_date = terms.maturity_date;
        }

        installments.push(ScheduledInstallment {
            sequence,
            scheduled_date: payment_date,
            principal_portion,
            interest_portion,
            total: principal_portion + interest_portion,
        });

        if is_final || clears_balance {
            break;
        }
        current_date = payment_date;
    }

    Ok(installments)
}

/// level monthly payment: r * P / (1 - (1 + r)^-n)
///
/// A zero rate falls back to the formula's limit, P / n.
fn level_payment(principal: Decimal, monthly_rate: Decimal, months: u32) -> Decimal {
    if months == 0 {
        return principal;
    }

    if monthly_rate.is_zero() {
        return principal / Decimal::from(months);
    }

    let base = Decimal::ONE + monthly_rate;
    let mut compound = Decimal::ONE;
    for _ in 0..months {
        match compound.checked_mul(base) {
            Some(next) => compound = next,
            // (1 + r)^-n has vanished; the payment is pure interest
            None => return principal * monthly_rate,
        }
    }

    principal * monthly_rate / (Decimal::ONE - Decimal::ONE / compound)
}
