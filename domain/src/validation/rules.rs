//! Tool-specific Layer 1 rules.
//!
//! Rules are data: a [`ToolRule`] names the required fields of one write
//! tool and the [`FieldCheck`]s applied to individual fields. Onboarding a
//! new write tool means adding a rule, not changing the validator.
//!
//! A required entry may list alternatives separated by `|`
//! (`"ContactID|Contact"`): any one of them satisfies the requirement.

use crate::core::args::{self, ArgMap};
use serde_json::Value;

/// A per-field check applied when the field is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    /// Must be a non-empty array.
    NonEmptyArray,
    /// Must be numeric. Zero is accepted with a warning; negatives are
    /// reported by the generic amount invariant.
    PositiveNumber,
    /// Must look like an email address.
    Email,
    /// Must be one of the listed values (case-insensitive).
    OneOf(&'static [&'static str]),
    /// Payment applications: non-empty, each entry references an invoice.
    AppliedInvoices,
}

/// Result of a single field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Ok,
    Error(String),
    Warning(String),
}

impl FieldCheck {
    pub fn check(&self, field: &str, value: &Value) -> Finding {
        match self {
            FieldCheck::NonEmptyArray => match value {
                Value::Array(items) if !items.is_empty() => Finding::Ok,
                Value::Array(_) => Finding::Error(format!("{field} must contain at least one entry")),
                _ => Finding::Error(format!("{field} must be a list")),
            },
            FieldCheck::PositiveNumber => match args::as_number(value) {
                None => Finding::Error(format!("{field} must be a positive number")),
                Some(n) if n == 0.0 => Finding::Warning(format!("{field} is zero")),
                Some(_) => Finding::Ok,
            },
            FieldCheck::Email => match value.as_str().map(str::trim) {
                Some(s) if looks_like_email(s) => Finding::Ok,
                _ => Finding::Error(format!("{field} is not a valid email address")),
            },
            FieldCheck::OneOf(allowed) => {
                let text = args::as_text(value).unwrap_or_default();
                if allowed.iter().any(|a| a.eq_ignore_ascii_case(text.trim())) {
                    Finding::Ok
                } else {
                    Finding::Error(format!("{field} must be one of: {}", allowed.join(", ")))
                }
            }
            FieldCheck::AppliedInvoices => {
                let Some(items) = value.as_array().filter(|a| !a.is_empty()) else {
                    return Finding::Error(format!(
                        "{field} must reference at least one applied invoice"
                    ));
                };
                let unreferenced = items
                    .iter()
                    .filter(|item| {
                        ["Invoice.InvoiceID", "InvoiceID", "InvoiceNumber"]
                            .iter()
                            .all(|path| args::text_at(item, path).is_none())
                    })
                    .count();
                if unreferenced > 0 {
                    Finding::Error(format!(
                        "{field}: {unreferenced} entr{} without an invoice reference",
                        if unreferenced == 1 { "y" } else { "ies" }
                    ))
                } else {
                    Finding::Ok
                }
            }
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !s.contains(' ')
}

/// Layer 1 rule for one write tool.
#[derive(Debug, Clone)]
pub struct ToolRule {
    pub tool: String,
    pub required: Vec<String>,
    pub checks: Vec<(String, FieldCheck)>,
}

impl ToolRule {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            required: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    pub fn check(mut self, field: impl Into<String>, check: FieldCheck) -> Self {
        self.checks.push((field.into(), check));
        self
    }

    /// Required entries not satisfied by `args`, reported by their first
    /// alternative.
    pub fn missing_fields(&self, args: &ArgMap) -> Vec<String> {
        self.required
            .iter()
            .filter(|entry| !entry.split('|').any(|alt| args::has_value(args, alt.trim())))
            .map(|entry| entry.split('|').next().unwrap_or(entry).trim().to_string())
            .collect()
    }
}

const BANK_TRANSACTION_TYPES: &[&str] = &["RECEIVE", "SPEND"];
const INVOICE_TYPES: &[&str] = &["ACCREC", "ACCPAY"];
const REPORT_TYPES: &[&str] = &[
    "ProfitAndLoss",
    "BalanceSheet",
    "AgedReceivables",
    "AgedPayables",
    "TrialBalance",
];

/// Built-in rules for the accounting tool surface.
pub fn default_rules() -> Vec<ToolRule> {
    vec![
        ToolRule::new("create_invoice")
            .require("ContactID|Contact")
            .require("LineItems")
            .check("LineItems", FieldCheck::NonEmptyArray)
            .check("Type", FieldCheck::OneOf(INVOICE_TYPES)),
        ToolRule::new("update_invoice").require("InvoiceID|InvoiceNumber"),
        ToolRule::new("approve_invoice").require("InvoiceID|InvoiceNumber"),
        ToolRule::new("void_invoice").require("InvoiceID|InvoiceNumber"),
        ToolRule::new("send_invoice")
            .require("InvoiceID|InvoiceNumber")
            .check("Email", FieldCheck::Email),
        ToolRule::new("extend_invoice_due_date")
            .require("InvoiceID|InvoiceNumber")
            .require("DueDate"),
        ToolRule::new("create_credit_note")
            .require("ContactID|Contact")
            .require("LineItems")
            .check("LineItems", FieldCheck::NonEmptyArray),
        ToolRule::new("create_payment")
            .require("Amount")
            .require("InvoiceID|Invoice|InvoiceNumber|Applications")
            .check("Amount", FieldCheck::PositiveNumber)
            .check("Applications", FieldCheck::AppliedInvoices),
        ToolRule::new("record_payment")
            .require("Amount")
            .require("InvoiceID|Invoice|InvoiceNumber|Applications")
            .check("Amount", FieldCheck::PositiveNumber)
            .check("Applications", FieldCheck::AppliedInvoices),
        ToolRule::new("cancel_payment").require("PaymentID"),
        ToolRule::new("create_contact")
            .require("Name")
            .check("EmailAddress", FieldCheck::Email),
        ToolRule::new("update_contact").require("ContactID"),
        ToolRule::new("delete_contact").require("ContactID"),
        ToolRule::new("create_bank_transaction")
            .require("Type")
            .require("BankAccount|AccountID")
            .require("LineItems")
            .check("Type", FieldCheck::OneOf(BANK_TRANSACTION_TYPES))
            .check("LineItems", FieldCheck::NonEmptyArray),
        ToolRule::new("import_bank_statement")
            .require("BankAccount|AccountID")
            .require("Lines")
            .check("Lines", FieldCheck::NonEmptyArray),
        ToolRule::new("reconcile_bank_statement").require("BankAccount|AccountID"),
        ToolRule::new("adjust_inventory")
            .require("ItemCode")
            .require("Quantity"),
        ToolRule::new("generate_report")
            .require("ReportType")
            .check("ReportType", FieldCheck::OneOf(REPORT_TYPES)),
        ToolRule::new("file_tax_return")
            .require("PeriodStart|FromDate")
            .require("PeriodEnd|ToDate"),
    ]
}
