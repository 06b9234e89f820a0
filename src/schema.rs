//! Document types and the schema templates that describe them.

use crate::error::ExtractError;
use crate::prompts::{INVOICE_SYSTEM_PROMPT, NULL_POLICY, RESUME_SYSTEM_PROMPT};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which schema the model is asked to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Invoice,
    Resume,
}

impl DocumentType {
    /// Every supported type, in display order.
    pub const ALL: [DocumentType; 2] = [DocumentType::Invoice, DocumentType::Resume];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Resume => "resume",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(DocumentType::Invoice),
            "resume" => Ok(DocumentType::Resume),
            other => Err(ExtractError::InvalidConfig(format!(
                "unknown document type '{other}' (expected: invoice, resume)"
            ))),
        }
    }
}

/// A fixed instruction template plus the field names it declares.
#[derive(Debug, Clone)]
pub struct SchemaTemplate {
    pub document_type: DocumentType,
    /// Full system directive, including the missing-field rule.
    pub system_prompt: String,
    /// Every field name the template declares, nested ones included.
    pub fields: &'static [&'static str],
    /// Keys expected at the root of the output object.
    pub top_level_fields: &'static [&'static str],
}

impl SchemaTemplate {
    /// Top-level keys absent from `value`.
    ///
    /// Informational only: the client never rejects a response because of it.
    pub fn missing_top_level_fields(&self, value: &serde_json::Value) -> Vec<&'static str> {
        match value.as_object() {
            Some(map) => self
                .top_level_fields
                .iter()
                .copied()
                .filter(|f| !map.contains_key(*f))
                .collect(),
            None => self.top_level_fields.to_vec(),
        }
    }
}

const INVOICE_FIELDS: &[&str] = &[
    "invoice_metadata",
    "invoice_number",
    "invoice_date",
    "due_date",
    "currency",
    "purchase_order",
    "seller",
    "buyer",
    "name",
    "address",
    "tax_id",
    "email",
    "phone",
    "line_items",
    "description",
    "quantity",
    "unit_price",
    "amount",
    "totals",
    "subtotal",
    "tax",
    "discount",
    "shipping",
    "total",
];

const INVOICE_TOP_LEVEL: &[&str] = &["invoice_metadata", "seller", "buyer", "line_items", "totals"];

const RESUME_FIELDS: &[&str] = &[
    "name",
    "email",
    "phone",
    "location",
    "linkedin",
    "summary",
    "skills",
    "experience",
    "company",
    "title",
    "start_date",
    "end_date",
    "description",
    "education",
    "institution",
    "degree",
    "field_of_study",
    "graduation_date",
];

const RESUME_TOP_LEVEL: &[&str] = &[
    "name",
    "email",
    "phone",
    "location",
    "linkedin",
    "summary",
    "skills",
    "experience",
    "education",
];

static INVOICE_TEMPLATE: Lazy<SchemaTemplate> = Lazy::new(|| SchemaTemplate {
    document_type: DocumentType::Invoice,
    system_prompt: format!("{INVOICE_SYSTEM_PROMPT}- {NULL_POLICY}\n"),
    fields: INVOICE_FIELDS,
    top_level_fields: INVOICE_TOP_LEVEL,
});

static RESUME_TEMPLATE: Lazy<SchemaTemplate> = Lazy::new(|| SchemaTemplate {
    document_type: DocumentType::Resume,
    system_prompt: format!("{RESUME_SYSTEM_PROMPT}- {NULL_POLICY}\n"),
    fields: RESUME_FIELDS,
    top_level_fields: RESUME_TOP_LEVEL,
});

/// Return the built-in template for a document type.
pub fn select_template(document_type: DocumentType) -> &'static SchemaTemplate {
    match document_type {
        DocumentType::Invoice => &INVOICE_TEMPLATE,
        DocumentType::Resume => &RESUME_TEMPLATE,
    }
}
