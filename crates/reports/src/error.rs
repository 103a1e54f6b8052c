use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render PDF: {0}")]
    Render(String),
}

impl From<printpdf::Error> for ReportError {
    fn from(value: printpdf::Error) -> Self {
        Self::Render(value.to_string())
    }
}
