//! Built-in pre-requisite chains for the accounting tool surface.
//!
//! | Write tool | Chain |
//! |------------|-------|
//! | `send_invoice` | `get_invoice` -> `get_contact`, resolves `Email` when absent |
//! | `void_invoice` | `get_invoice`, only unpaid AUTHORISED / SUBMITTED / DRAFT |
//! | `approve_invoice` | `get_invoice`, only DRAFT / SUBMITTED |
//! | `delete_contact` | `get_contact`, blocked on an outstanding balance |
//! | `create_payment` | `list_accounts` resolves `AccountId`, `get_invoice` checks amount due |

use super::payload::{first_record, records};
use super::step::{FailurePolicy, PreReqConfig, PreReqRegistry, PreReqStep, StepInput, StepVerdict};
use crate::core::args::{self, ArgMap, ChainData};
use crate::mcq::options_from_records;
use serde_json::Value;

/// Registry with every built-in chain.
pub fn default_prereq_registry() -> PreReqRegistry {
    PreReqRegistry::new()
        .with("send_invoice", send_invoice())
        .with("void_invoice", void_invoice())
        .with("approve_invoice", approve_invoice())
        .with("delete_contact", delete_contact())
        .with("create_payment", create_payment())
}

fn send_invoice() -> PreReqConfig {
    PreReqConfig::new(vec![
        PreReqStep::new("get_invoice", invoice_lookup)
            .when(|args, _| !args::has_value(args, "Email"))
            .extract_field("Contact.ContactID")
            .inject_into("_contact_id")
            .validate(|input| {
                let Some(invoice) = first_record(input.result) else {
                    return StepVerdict::block("Invoice not found");
                };
                let label = invoice_label(invoice);
                match status(invoice).as_deref() {
                    Some(s @ ("VOIDED" | "DELETED")) => {
                        return StepVerdict::block(format!(
                            "Invoice {label} is {s} and cannot be sent"
                        ));
                    }
                    Some("DRAFT") => {
                        return StepVerdict::block(format!(
                            "Invoice {label} is still a DRAFT; approve it before sending"
                        ));
                    }
                    _ => {}
                }
                if !input.chain.contains_key("contact_id") {
                    return StepVerdict::ask(
                        format!(
                            "Invoice {label} has no linked contact. Which email address should it be sent to?"
                        ),
                        Vec::new(),
                        Some("Email"),
                    );
                }
                StepVerdict::Pass
            })
            .describe("Fetch the invoice to find its contact"),
        PreReqStep::new("get_contact", |_, chain| {
            sub_args([("ContactID", chain.get("contact_id").cloned())])
        })
        .when(|args, chain| !args::has_value(args, "Email") && chain.contains_key("contact_id"))
        .inject_into("Email")
        .validate(|input| {
            let contact = first_record(input.result);
            if let Some(email) = contact.and_then(|c| args::text_at(c, "EmailAddress")) {
                return StepVerdict::Resolve(Value::String(email));
            }
            let name = contact
                .and_then(|c| args::text_at(c, "Name"))
                .unwrap_or_else(|| "The contact".to_string());
            StepVerdict::ask(
                format!(
                    "{name} has no email address on file. Which address should the invoice be sent to?"
                ),
                Vec::new(),
                Some("Email"),
            )
        })
        .on_failure(FailurePolicy::AskUser)
        .asks_for("Email")
        .describe("Resolve the contact's email address"),
    ])
}

fn void_invoice() -> PreReqConfig {
    PreReqConfig::new(vec![
        PreReqStep::new("get_invoice", invoice_lookup)
            .validate(|input| {
                let Some(invoice) = first_record(input.result) else {
                    return StepVerdict::block("Invoice not found");
                };
                let label = invoice_label(invoice);
                match status(invoice).as_deref() {
                    Some("PAID") => StepVerdict::block(format!(
                        "Invoice {label} is PAID and cannot be voided; remove its payments first"
                    )),
                    Some(s @ ("VOIDED" | "DELETED")) => StepVerdict::block(format!(
                        "Invoice {label} is already {}",
                        s.to_ascii_lowercase()
                    )),
                    Some("AUTHORISED" | "SUBMITTED" | "DRAFT") => {
                        match number_at(invoice, "AmountPaid").filter(|paid| *paid > 0.0) {
                            Some(paid) => StepVerdict::block(format!(
                                "Invoice {label} has {paid:.2} paid against it and cannot be voided"
                            )),
                            None => StepVerdict::Pass,
                        }
                    }
                    Some(other) => StepVerdict::block(format!(
                        "Invoice {label} cannot be voided from status {other}"
                    )),
                    None => StepVerdict::block(format!(
                        "Could not determine the status of invoice {label}"
                    )),
                }
            })
            .describe("Check the invoice can be voided"),
    ])
}

fn approve_invoice() -> PreReqConfig {
    PreReqConfig::new(vec![
        PreReqStep::new("get_invoice", invoice_lookup)
            .validate(|input| {
                let Some(invoice) = first_record(input.result) else {
                    return StepVerdict::block("Invoice not found");
                };
                match status(invoice).as_deref() {
                    Some("DRAFT" | "SUBMITTED") => StepVerdict::Pass,
                    other => StepVerdict::block(format!(
                        "Only DRAFT or SUBMITTED invoices can be approved; invoice {} is {}",
                        invoice_label(invoice),
                        other.unwrap_or("in an unknown state")
                    )),
                }
            })
            .describe("Check the invoice is awaiting approval"),
    ])
}

const OUTSTANDING_PATHS: [&str; 4] = [
    "Balances.AccountsReceivable.Outstanding",
    "Balances.AccountsPayable.Outstanding",
    "OutstandingBalance",
    "Balance",
];

fn delete_contact() -> PreReqConfig {
    PreReqConfig::new(vec![
        PreReqStep::new("get_contact", |args, _| {
            sub_args([("ContactID", args::find(args, "ContactID").cloned())])
        })
        .validate(|input| {
            let Some(contact) = first_record(input.result) else {
                return StepVerdict::block("Contact not found");
            };
            let outstanding = OUTSTANDING_PATHS
                .iter()
                .filter_map(|path| number_at(contact, path))
                .find(|amount| amount.abs() > f64::EPSILON);
            match outstanding {
                Some(amount) => StepVerdict::block(format!(
                    "{} has an outstanding balance of {amount:.2} and cannot be deleted",
                    args::text_at(contact, "Name").unwrap_or_else(|| "The contact".to_string())
                )),
                None => StepVerdict::Pass,
            }
        })
        .describe("Check the contact has no outstanding balance"),
    ])
}

fn create_payment() -> PreReqConfig {
    PreReqConfig::new(vec![
        PreReqStep::new("list_accounts", |_, _| {
            sub_args([("Type", Some(Value::String("BANK".into())))])
        })
        .when(|args, _| !has_account(args))
        .inject_into("AccountId")
        .validate(resolve_bank_account)
        .on_failure(FailurePolicy::AskUser)
        .asks_for("AccountId")
        .describe("Resolve the bank account receiving the payment"),
        PreReqStep::new("get_invoice", invoice_lookup)
            .when(|args, _| has_invoice_ref(args))
            .validate(|input| {
                let Some(invoice) = first_record(input.result) else {
                    return StepVerdict::block("Invoice not found");
                };
                let label = invoice_label(invoice);
                match status(invoice).as_deref() {
                    Some("AUTHORISED") => {}
                    other => {
                        return StepVerdict::block(format!(
                            "Payments can only be applied to AUTHORISED invoices; invoice {label} is {}",
                            other.unwrap_or("in an unknown state")
                        ));
                    }
                }
                let amount = args::find(input.args, "Amount").and_then(args::as_number);
                let due = number_at(invoice, "AmountDue");
                if let (Some(amount), Some(due)) = (amount, due)
                    && amount > due + 0.005
                {
                    return StepVerdict::block(format!(
                        "Payment of {amount:.2} exceeds the {due:.2} due on invoice {label}"
                    ));
                }
                StepVerdict::Pass
            })
            .describe("Check the invoice can take the payment"),
    ])
}

fn resolve_bank_account(input: &StepInput<'_>) -> StepVerdict {
    let accounts: Vec<&Value> = records(input.result)
        .into_iter()
        .filter(|a| {
            args::text_at(a, "Type").is_none_or(|t| t.eq_ignore_ascii_case("BANK"))
                && !status(a).is_some_and(|s| s == "ARCHIVED")
        })
        .collect();

    match accounts.as_slice() {
        [] => StepVerdict::block("No active bank account is available to receive this payment"),
        [only] => match args::text_at(only, "AccountID") {
            Some(id) => StepVerdict::Resolve(Value::String(id)),
            None => StepVerdict::block("The only bank account has no AccountID"),
        },
        many => StepVerdict::ask(
            format!(
                "Which bank account should receive this payment? ({} found)",
                many.len()
            ),
            options_from_records(
                many.iter().copied(),
                "AccountID",
                &["Name", "Code"],
                &["BankAccountNumber", "CurrencyCode"],
                input.preview_limit,
            ),
            Some("AccountId"),
        ),
    }
}

/// Build sub-call arguments, dropping absent values.
fn sub_args<const N: usize>(pairs: [(&str, Option<Value>); N]) -> ArgMap {
    pairs
        .into_iter()
        .filter_map(|(k, v)| v.filter(args::is_present).map(|v| (k.to_string(), v)))
        .collect()
}

/// Text at a dotted path rooted in the write arguments.
fn arg_text(args: &ArgMap, path: &str) -> Option<String> {
    let (head, rest) = path.split_once('.').unwrap_or((path, ""));
    args::text_at(args::find(args, head)?, rest)
}

fn invoice_lookup(args: &ArgMap, _: &ChainData) -> ArgMap {
    if let Some(id) = arg_text(args, "InvoiceID").or_else(|| arg_text(args, "Invoice.InvoiceID")) {
        return sub_args([("InvoiceID", Some(Value::String(id)))]);
    }
    let number = arg_text(args, "InvoiceNumber").or_else(|| arg_text(args, "Invoice.InvoiceNumber"));
    sub_args([("InvoiceNumber", number.map(Value::String))])
}

fn has_invoice_ref(args: &ArgMap) -> bool {
    !invoice_lookup(args, &ChainData::new()).is_empty()
}

fn has_account(args: &ArgMap) -> bool {
    ["AccountID", "AccountCode", "Account.AccountID", "Account.Code"]
        .iter()
        .any(|path| arg_text(args, path).is_some())
}

fn status(record: &Value) -> Option<String> {
    args::text_at(record, "Status").map(|s| s.to_ascii_uppercase())
}

fn number_at(record: &Value, path: &str) -> Option<f64> {
    args::get_path(record, path).and_then(args::as_number)
}

fn invoice_label(invoice: &Value) -> String {
    args::text_at(invoice, "InvoiceNumber")
        .or_else(|| args::text_at(invoice, "InvoiceID"))
        .unwrap_or_else(|| "(unknown)".to_string())
}
