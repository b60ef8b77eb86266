/*!
 * Local Purchase Order drafting and export.
 *
 * An [`LpoDraft`] is an editable, never persisted purchase order. Totals are
 * recomputed from the line items on every call. [`layout::build`] turns a draft
 * into a declarative page description and [`render::render_pdf`] paints it.
 */

pub mod layout;
pub mod render;
pub mod words;

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::errors::ServiceError;
use crate::models::{MaterialRequest, RequestStatus};

pub use layout::{DocumentLayout, LayoutOptions};
pub use render::{render_pdf, RenderError};
pub use words::{amount_in_words, CurrencyWords};

pub const VAT_RATE: Decimal = dec!(0.05);

/// Rounds a money amount to two places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Fixed two-decimal rendering used on the document.
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "2")]
    pub quantity: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "10.00")]
    pub rate: Decimal,
}

impl LineItem {
    /// Panics on overflow; validated drafts never overflow.
    pub fn line_total(&self) -> Decimal {
        self.quantity * self.rate
    }

    pub fn checked_line_total(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.rate)
    }
}

/// Subtotal, VAT and grand total of a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

/// `None` when any line total or sum leaves the `Decimal` range.
pub fn checked_totals(items: &[LineItem]) -> Option<Totals> {
    let subtotal = items.iter().try_fold(Decimal::ZERO, |sum, item| {
        sum.checked_add(item.checked_line_total()?)
    })?;
    let vat = subtotal.checked_mul(VAT_RATE)?;
    let total = subtotal.checked_add(vat)?;
    Some(Totals { subtotal, vat, total })
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

fn validate_items(items: &Vec<LineItem>) -> Result<(), ValidationError> {
    if items.is_empty() {
        let mut err = ValidationError::new("items_empty");
        err.message = Some("an LPO needs at least one line item".into());
        return Err(err);
    }
    if items.iter().any(|item| item.validate().is_err()) {
        let mut err = ValidationError::new("item_invalid");
        err.message = Some("quantity and rate must not be negative".into());
        return Err(err);
    }
    if checked_totals(items).is_none() {
        let mut err = ValidationError::new("amount_overflow");
        err.message = Some("line amounts are too large to total".into());
        return Err(err);
    }
    Ok(())
}

/// Addressee block printed under the LPO number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SupplierBlock {
    pub company_name: String,
    pub city: String,
    pub po_box: String,
    pub contact_person: String,
    pub phone: String,
    pub trn: String,
    pub project: String,
    pub delivery_terms: String,
    pub delivery_contact: String,
}

impl Default for SupplierBlock {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            city: String::new(),
            po_box: "P.O BOX: ".to_string(),
            contact_person: String::new(),
            phone: String::new(),
            trn: "100280249000003".to_string(),
            project: String::new(),
            delivery_terms: "90 DAYS PDC".to_string(),
            delivery_contact: String::new(),
        }
    }
}

/// Issuing company identity shown on the letterhead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub trn_label: String,
    pub signatory_name: String,
    pub signatory_title: String,
    pub logo_path: Option<String>,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: "Newell Electromechanical Works LLC".to_string(),
            address: "P.O Box: BB593 Dubai,U.A.E".to_string(),
            phone: "+971 4 8843367".to_string(),
            email: "info@newellmepco.com".to_string(),
            trn_label: "New well TRN".to_string(),
            signatory_name: "Hesham Youssef".to_string(),
            signatory_title: "Managing Partner".to_string(),
            logo_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LpoDraft {
    pub lpo_number: String,
    /// e.g. `5TH AUGUST, 2025`
    pub date_label: String,
    pub department: String,
    pub supplier: SupplierBlock,
    #[validate(custom = "validate_items")]
    pub items: Vec<LineItem>,
    pub conditions: String,
}

impl Default for LpoDraft {
    fn default() -> Self {
        Self {
            lpo_number: String::new(),
            date_label: format_date_label(chrono::Local::now().date_naive()),
            department: "Electrical".to_string(),
            supplier: SupplierBlock::default(),
            items: vec![LineItem::default()],
            conditions: String::new(),
        }
    }
}

impl LpoDraft {
    pub fn new(lpo_number: impl Into<String>) -> Self {
        Self {
            lpo_number: lpo_number.into(),
            ..Self::default()
        }
    }

    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(item);
    }

    pub fn update_item(&mut self, index: usize, item: LineItem) -> Result<(), ServiceError> {
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| ServiceError::NotFound(format!("line item {}", index + 1)))?;
        *slot = item;
        Ok(())
    }

    /// Removes a row. The last remaining row is kept.
    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, ServiceError> {
        if index >= self.items.len() {
            return Err(ServiceError::NotFound(format!("line item {}", index + 1)));
        }
        if self.items.len() == 1 {
            return Err(ServiceError::BadRequest(
                "an LPO needs at least one line item".to_string(),
            ));
        }
        Ok(self.items.remove(index))
    }

    /// Seeds the draft from an approved material request.
    pub fn import_request(&mut self, request: &MaterialRequest) -> Result<(), ServiceError> {
        if request.status != RequestStatus::Approved {
            return Err(ServiceError::InvalidStatus(format!(
                "{} is {}; only approved requests can seed an LPO",
                request.mrf_number, request.status
            )));
        }

        self.items = request
            .materials
            .iter()
            .map(|line| LineItem {
                description: line.description.clone(),
                unit: line.unit.clone(),
                quantity: line.quantity,
                rate: Decimal::ZERO,
            })
            .collect();
        if self.items.is_empty() {
            self.items.push(LineItem::default());
        }

        self.department = request.department.to_uppercase();
        self.supplier.project = format!("{} - {}", request.project_name, request.site_location);
        self.supplier.delivery_contact = format!(
            "{} / {}",
            request.engineer_name, self.supplier.delivery_contact
        );

        let reference = format!(
            "MRF: {} | Engineer: {} | Site: {} | Request Date: {}",
            request.mrf_number, request.engineer_name, request.site_location, request.request_date
        );
        self.conditions = if self.conditions.is_empty() {
            reference
        } else {
            format!("{}\n\n{}", self.conditions, reference)
        };
        Ok(())
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    pub fn vat(&self) -> Decimal {
        self.subtotal() * VAT_RATE
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() + self.vat()
    }

    pub fn total_in_words(&self, currency: &CurrencyWords) -> String {
        amount_in_words(self.total(), currency)
    }

    pub fn file_name(&self) -> String {
        format!("LPO-{}.pdf", self.lpo_number)
    }

    pub fn preview(&self, currency: &CurrencyWords) -> LpoPreview {
        LpoPreview {
            lpo_number: self.lpo_number.clone(),
            department: self.department.clone(),
            items: self
                .items
                .iter()
                .enumerate()
                .map(|(index, item)| PreviewLine {
                    sc_no: index + 1,
                    description: item.description.clone(),
                    unit: item.unit.clone(),
                    quantity: item.quantity,
                    rate: item.rate,
                    line_total: round_money(item.line_total()),
                })
                .collect(),
            subtotal: round_money(self.subtotal()),
            vat: round_money(self.vat()),
            total: round_money(self.total()),
            total_in_words: self.total_in_words(currency),
            file_name: self.file_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLine {
    pub sc_no: usize,
    pub description: String,
    pub unit: String,
    #[schema(value_type = String)]
    pub quantity: Decimal,
    #[schema(value_type = String)]
    pub rate: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

/// Computed view of a draft.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LpoPreview {
    pub lpo_number: String,
    pub department: String,
    pub items: Vec<PreviewLine>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub vat: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub total_in_words: String,
    pub file_name: String,
}

/// `5TH AUGUST, 2025`
pub fn format_date_label(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match day {
        1 | 21 | 31 => "ST",
        2 | 22 => "ND",
        3 | 23 => "RD",
        _ => "TH",
    };
    format!(
        "{}{} {}, {}",
        day,
        suffix,
        date.format("%B").to_string().to_uppercase(),
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaterialLine;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn item(quantity: Decimal, rate: Decimal) -> LineItem {
        LineItem {
            description: "Item".into(),
            unit: "pcs".into(),
            quantity,
            rate,
        }
    }

    fn approved_request() -> MaterialRequest {
        MaterialRequest {
            id: Uuid::new_v4(),
            request_date: NaiveDate::from_ymd_opt(2025, 8, 5).unwrap(),
            mrf_number: "MRF-2508-0042".into(),
            engineer_name: "Omar".into(),
            project_name: "Villa 12".into(),
            site_location: "Al Barsha".into(),
            department: "Plumbing".into(),
            status: RequestStatus::Approved,
            materials: vec![MaterialLine {
                description: "PPR pipe 25mm".into(),
                quantity: dec!(40),
                unit: "m".into(),
                remarks: String::new(),
            }],
        }
    }

    #[test]
    fn totals_follow_items() {
        let mut draft = LpoDraft::new("1004");
        draft.items = vec![item(dec!(2), dec!(10)), item(dec!(1), dec!(5))];
        assert_eq!(draft.subtotal(), dec!(25));
        assert_eq!(draft.vat(), dec!(1.25));
        assert_eq!(draft.total(), dec!(26.25));
        assert_eq!(
            draft.total_in_words(&CurrencyWords::default()),
            "Twenty-six dirhams and twenty-five fils"
        );
    }

    #[test]
    fn totals_are_recomputed_after_edits() {
        let mut draft = LpoDraft::new("1");
        draft.update_item(0, item(dec!(3), dec!(100))).unwrap();
        assert_eq!(draft.total(), dec!(315));
        draft.add_item(item(dec!(1), dec!(100)));
        assert_eq!(draft.subtotal(), dec!(400));
        draft.remove_item(0).unwrap();
        assert_eq!(draft.subtotal(), dec!(100));
    }

    #[test]
    fn last_row_cannot_be_removed() {
        let mut draft = LpoDraft::new("1");
        assert!(matches!(draft.remove_item(0), Err(ServiceError::BadRequest(_))));
        assert!(matches!(draft.remove_item(5), Err(ServiceError::NotFound(_))));
        assert_eq!(draft.items.len(), 1);
    }

    #[test]
    fn import_copies_request_details() {
        let mut draft = LpoDraft::new("1005");
        draft.conditions = "Deliver before noon".into();
        draft.import_request(&approved_request()).unwrap();

        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].quantity, dec!(40));
        assert_eq!(draft.items[0].rate, Decimal::ZERO);
        assert_eq!(draft.department, "PLUMBING");
        assert_eq!(draft.supplier.project, "Villa 12 - Al Barsha");
        assert_eq!(draft.supplier.delivery_contact, "Omar / ");
        assert_eq!(
            draft.conditions,
            "Deliver before noon\n\nMRF: MRF-2508-0042 | Engineer: Omar | Site: Al Barsha | Request Date: 2025-08-05"
        );
    }

    #[test]
    fn import_requires_approved_request() {
        let mut request = approved_request();
        request.status = RequestStatus::Pending;
        let mut draft = LpoDraft::new("1");
        assert!(matches!(
            draft.import_request(&request),
            Err(ServiceError::InvalidStatus(_))
        ));
    }

    #[test]
    fn date_label_suffixes() {
        let label = |d| format_date_label(NaiveDate::from_ymd_opt(2025, 8, d).unwrap());
        assert_eq!(label(5), "5TH AUGUST, 2025");
        assert_eq!(label(1), "1ST AUGUST, 2025");
        assert_eq!(label(22), "22ND AUGUST, 2025");
        assert_eq!(label(23), "23RD AUGUST, 2025");
        assert_eq!(label(11), "11TH AUGUST, 2025");
    }

    #[test]
    fn validation_rejects_empty_items_and_negative_rates() {
        let mut draft = LpoDraft::new("1");
        assert!(draft.validate().is_ok());
        draft.items[0].rate = dec!(-1);
        assert!(draft.validate().is_err());
        draft.items.clear();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn oversized_amounts_fail_validation() {
        let mut draft = LpoDraft::new("1");
        draft.items = vec![item(Decimal::MAX, dec!(2))];
        assert!(checked_totals(&draft.items).is_none());
        assert!(draft.validate().is_err());

        draft.items = vec![item(Decimal::MAX, dec!(1)), item(dec!(1), dec!(1))];
        assert!(draft.validate().is_err());

        // Fits as a subtotal but not once VAT is added.
        draft.items = vec![item(Decimal::MAX, dec!(1))];
        assert!(draft.validate().is_err());

        draft.items = vec![item(dec!(3), dec!(4)), item(dec!(1), dec!(0.5))];
        let totals = checked_totals(&draft.items).unwrap();
        assert_eq!(totals.subtotal, draft.subtotal());
        assert_eq!(totals.vat, draft.vat());
        assert_eq!(totals.total, draft.total());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn preview_carries_rounded_totals() {
        let mut draft = LpoDraft::new("77");
        draft.items = vec![item(dec!(3), dec!(0.333))];
        let preview = draft.preview(&CurrencyWords::default());
        assert_eq!(preview.items[0].line_total, dec!(1.00));
        assert_eq!(preview.file_name, "LPO-77.pdf");
    }

    proptest! {
        #[test]
        fn total_is_subtotal_plus_five_percent(
            rows in proptest::collection::vec((0u32..10_000, 0u32..1_000_000), 1..20)
        ) {
            let mut draft = LpoDraft::new("p");
            draft.items = rows
                .iter()
                .map(|(q, r)| item(Decimal::from(*q), Decimal::new(*r as i64, 2)))
                .collect();
            let subtotal: Decimal = draft.items.iter().map(LineItem::line_total).sum();
            prop_assert_eq!(draft.subtotal(), subtotal);
            prop_assert_eq!(draft.vat(), subtotal * dec!(0.05));
            prop_assert_eq!(draft.total(), draft.subtotal() + draft.vat());
            prop_assert!(draft.total() >= draft.subtotal());
        }
    }
}
