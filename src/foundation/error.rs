pub type ReelResult<T> = Result<T, ReelError>;

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid caller input. Fatal to a whole batch when it concerns the source root.
    #[error("{0}")]
    Validation(String),

    /// A folder or document produced no usable frame.
    #[error("{0}")]
    NoFrames(String),

    /// The encoder could not be opened, written to or finalized.
    #[error("Could not create video file: {0}")]
    OutputStream(String),

    #[error("PDF conversion failed: {0}")]
    Rasterization(String),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn no_frames(msg: impl Into<String>) -> Self {
        Self::NoFrames(msg.into())
    }

    pub fn output_stream(msg: impl Into<String>) -> Self {
        Self::OutputStream(msg.into())
    }

    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization(msg.into())
    }

    /// Only validation errors abort a batch; everything else is recorded per folder.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            ReelError::no_frames("No valid images found").to_string(),
            "No valid images found"
        );
        assert!(
            ReelError::output_stream("ffmpeg missing")
                .to_string()
                .starts_with("Could not create video file")
        );
        assert!(
            ReelError::rasterization("no pages")
                .to_string()
                .contains("PDF conversion failed:")
        );
    }

    #[test]
    fn only_validation_is_fatal() {
        assert!(ReelError::validation("x").is_fatal());
        assert!(!ReelError::no_frames("x").is_fatal());
        assert!(!ReelError::output_stream("x").is_fatal());
        assert!(!ReelError::rasterization("x").is_fatal());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
