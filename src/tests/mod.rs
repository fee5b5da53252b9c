
mod document_cases;
