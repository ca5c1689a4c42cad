use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::Ledger;
use crate::context::Context;
use crate::errors::{LedgerError, Result};
use crate::records::{Company, NewCompany};
use crate::types::CompanyId;

impl Ledger {
    /// register a company; registration numbers are unique
    #[instrument(
        name = "ledger.create_company",
        skip(self, ctx, new_company),
        fields(registration_number = %new_company.registration_number),
        err
    )]
    pub fn create_company(&self, ctx: &Context, new_company: NewCompany) -> Result<Company> {
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: new_company.name,
            registration_number: new_company.registration_number,
            tax_id: new_company.tax_id,
            contact_person: new_company.contact_person,
            email: new_company.email,
            phone: new_company.phone,
            address: new_company.address,
            is_active: new_company.is_active,
            created_at: now,
            updated_at: now,
        };

        self.db.unit_of_work(ctx, |s| s.insert_company(&company))?;

        info!(company_id = %company.id, "company registered");
        Ok(company)
    }

    #[instrument(name = "ledger.get_company", skip(self, ctx), err)]
    pub fn get_company(&self, ctx: &Context, id: CompanyId) -> Result<Company> {
        self.db
            .snapshot(ctx, |s| s.find_company(id))?
            .ok_or_else(|| LedgerError::not_found("company", id))
    }

    #[instrument(name = "ledger.get_company_by_registration_number", skip(self, ctx), err)]
    pub fn get_company_by_registration_number(
        &self,
        ctx: &Context,
        registration_number: &str,
    ) -> Result<Company> {
        self.db
            .snapshot(ctx, |s| s.find_company_by_registration_number(registration_number))?
            .ok_or_else(|| LedgerError::not_found("company", registration_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::ledger;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_and_fetch_company() {
        let ledger = ledger();
        let ctx = Context::background();

        let mut request = NewCompany::new("Northwind Traders", "NW-1001");
        request.tax_id = Some("TX-55".to_string());
        request.email = Some("treasury@northwind.example".to_string());
        let created = ledger.create_company(&ctx, request).unwrap();

        let by_id = ledger.get_company(&ctx, created.id).unwrap();
        assert_eq!(by_id, created);

        let by_number = ledger
            .get_company_by_registration_number(&ctx, "NW-1001")
            .unwrap();
        assert_eq!(by_number.id, created.id);
        assert_eq!(by_number.tax_id.as_deref(), Some("TX-55"));
    }

    #[test]
    fn test_duplicate_registration_number_conflicts() {
        let ledger = ledger();
        let ctx = Context::background();

        ledger
            .create_company(&ctx, NewCompany::new("First", "DUP-1"))
            .unwrap();
        let err = ledger
            .create_company(&ctx, NewCompany::new("Second", "DUP-1"))
            .unwrap_err();

        assert!(matches!(err, LedgerError::Conflict { .. }));
        assert_eq!(
            ledger
                .get_company_by_registration_number(&ctx, "DUP-1")
                .unwrap()
                .name,
            "First"
        );
    }

    #[test]
    fn test_missing_company_is_not_found() {
        let ledger = ledger();
        let ctx = Context::background();

        assert!(matches!(
            ledger.get_company(&ctx, Uuid::new_v4()),
            Err(LedgerError::NotFound { entity: "company", .. })
        ));
        assert!(matches!(
            ledger.get_company_by_registration_number(&ctx, "NOPE"),
            Err(LedgerError::NotFound { .. })
        ));
    }
}
