//! Speaking-style instructions sent with every speech synthesis request.
//!
//! Callers can override the default via
//! [`crate::config::VideoConfig::tts_instructions`]; the constant here is used
//! only when no override is provided.

/// Default narration style for picture-book style documents.
pub const DEFAULT_NARRATION_INSTRUCTIONS: &str =
    "Speak in a dramatic and comical voice. Be very excited and happy to be reading this book.";

/// Resolve the instructions actually sent to the speech endpoint.
///
/// An empty override means "no instructions" and is dropped from the request.
pub fn narration_instructions(custom: Option<&str>) -> Option<&str> {
    match custom {
        Some(s) if s.trim().is_empty() => None,
        Some(s) => Some(s),
        None => Some(DEFAULT_NARRATION_INSTRUCTIONS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_used_without_override() {
        assert_eq!(
            narration_instructions(None),
            Some(DEFAULT_NARRATION_INSTRUCTIONS)
        );
    }

    #[test]
    fn blank_override_disables_instructions() {
        assert_eq!(narration_instructions(Some("   ")), None);
        assert_eq!(narration_instructions(Some("Calm.")), Some("Calm."));
    }
}
