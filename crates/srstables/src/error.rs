#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid ratio window {min}..={max} (expected 0 < min <= max)")]
    InvalidRatio { min: f64, max: f64 },

    #[error("At least one residence label is required")]
    NoResidenceLabels,

    #[error("Cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
