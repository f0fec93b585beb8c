pub type EspStackResult<T> = Result<T, EspStackError>;

#[derive(thiserror::Error, Debug)]
pub enum EspStackError {
    #[error("validation error: {0}")]
    Validation(String),

    /// A shared asset (the legend) is absent. Fatal: the batch never starts.
    #[error("missing required asset: {0}")]
    MissingRequiredAsset(String),

    /// No qualifying base/overlay index pairs. Fatal: zero items processed.
    #[error("empty index set: {0}")]
    EmptyIndexSet(String),

    #[error("load error: {0}")]
    Load(String),

    #[error("save error: {0}")]
    Save(String),

    /// Compositor invoked with unaligned rasters. Indicates a reconciliation
    /// defect upstream; never silently corrected.
    #[error("dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EspStackError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn missing_required_asset(msg: impl Into<String>) -> Self {
        Self::MissingRequiredAsset(msg.into())
    }

    pub fn empty_index_set(msg: impl Into<String>) -> Self {
        Self::EmptyIndexSet(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn save(msg: impl Into<String>) -> Self {
        Self::Save(msg.into())
    }

    pub fn dimension_mismatch(expected: (u32, u32), got: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: got.0,
            height: got.1,
        }
    }
}
