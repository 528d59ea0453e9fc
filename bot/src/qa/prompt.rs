//! # Prompt Builder
//!
//! File: bot/src/qa/prompt.rs
//! Author: Christi Mahu
//!
//! Turns a user question and the loaded document into the single instruction
//! sent to the model. The whole document is embedded verbatim; there is no
//! truncation, so prompt size grows with the document.
//!
use super::document::Document;

/// The reply the model is told to give when the document lacks the answer.
pub const NOT_IN_DOCUMENT_REPLY: &str =
    "I'm sorry, I don't have that information in the provided data.";

/// # Build Prompt (`build_prompt`)
///
/// Pure and deterministic: the same question and document always produce the
/// same bytes.
pub fn build_prompt(question: &str, document: &Document) -> String {
    format!(
        "Given the following JSON data about a company:\n\
         \n\
         {document}\n\
         \n\
         Please answer the following question:\n\
         {question}\n\
         \n\
         Provide a concise and accurate answer based only on the information given in the JSON data. \
         If the information is not available in the data, please respond with \"{fallback}\"",
        document = document.rendered(),
        question = question,
        fallback = NOT_IN_DOCUMENT_REPLY,
    )
}
