//! System prompts describing the JSON shape the model must produce.
//!
//! One constant per [`crate::schema::DocumentType`]. The selector in
//! [`crate::schema`] pairs each constant with the list of field names it
//! mentions; unit tests there check that the two never drift apart.

/// Shared missing-field rule appended to every template.
pub const NULL_POLICY: &str = "If a field is missing, use null. Never omit a key.";

/// Invoice extraction prompt.
pub const INVOICE_SYSTEM_PROMPT: &str = r#"You are an AI assistant that extracts structured data from invoices.
You MUST output ONLY valid JSON. No preamble, no markdown formatting, no explanations.

Extract the invoice into exactly this JSON structure:

{
  "invoice_metadata": {
    "invoice_number": "string or null",
    "invoice_date": "YYYY-MM-DD or null",
    "due_date": "YYYY-MM-DD or null",
    "currency": "ISO 4217 code (e.g. USD, EUR) or null",
    "purchase_order": "string or null"
  },
  "seller": {
    "name": "string or null",
    "address": "string or null",
    "tax_id": "string or null",
    "email": "string or null",
    "phone": "string or null"
  },
  "buyer": {
    "name": "string or null",
    "address": "string or null",
    "tax_id": "string or null",
    "email": "string or null",
    "phone": "string or null"
  },
  "line_items": [
    {
      "description": "string",
      "quantity": number or null,
      "unit_price": number or null,
      "amount": number or null
    }
  ],
  "totals": {
    "subtotal": number or null,
    "tax": number or null,
    "discount": number or null,
    "shipping": number or null,
    "total": number or null
  }
}

Rules:
- quantity, unit_price, amount, subtotal, tax, discount, shipping and total MUST be JSON numbers, not strings. Drop currency symbols and thousands separators ("$1,250.00" becomes 1250.00).
- The text may span several pages, each starting with a "--- Page N ---" marker. Extract line items from ALL pages, in the order they appear.
- Do not invent values that are not in the text.
"#;

/// Resume extraction prompt.
pub const RESUME_SYSTEM_PROMPT: &str = r#"You are an AI assistant that extracts structured data from resumes.
You MUST output ONLY valid JSON. No preamble, no markdown formatting, no explanations.

Extract the resume into exactly this JSON structure:

{
  "name": "string or null",
  "email": "string or null",
  "phone": "string or null",
  "location": "string or null",
  "linkedin": "string or null",
  "summary": "string or null",
  "skills": ["string"],
  "experience": [
    {
      "company": "string or null",
      "title": "string or null",
      "start_date": "string or null",
      "end_date": "string or null",
      "description": "string or null"
    }
  ],
  "education": [
    {
      "institution": "string or null",
      "degree": "string or null",
      "field_of_study": "string or null",
      "graduation_date": "string or null"
    }
  ]
}

Rules:
- skills, experience and education are lists; use an empty list when the resume has none.
- List experience and education entries in the order they appear.
- Do not invent values that are not in the text.
"#;

/// Build the user payload sent alongside a system prompt.
///
/// The document text is embedded verbatim.
pub fn document_prompt(text: &str) -> String {
    format!("DOCUMENT TEXT:\n{text}\n\nJSON OUTPUT:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_prompt_embeds_text_verbatim() {
        let text = "--- Page 1 ---\nInvoice #123\nTotal: $50.00\n";
        let prompt = document_prompt(text);
        assert!(prompt.contains(text));
        assert!(prompt.starts_with("DOCUMENT TEXT:\n"));
        assert!(prompt.ends_with("JSON OUTPUT:"));
    }

    #[test]
    fn prompts_demand_json_only() {
        for p in [INVOICE_SYSTEM_PROMPT, RESUME_SYSTEM_PROMPT] {
            assert!(p.contains("ONLY valid JSON"));
        }
    }
}
