#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Sheet {0:?} not found")]
    MissingSheet(String),

    #[error("Workbook error: {0}")]
    Workbook(String),
}
