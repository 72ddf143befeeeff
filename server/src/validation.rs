use crate::error::ApiError;

/// Maximum text length for a streaming request
const MAX_TEXT_LENGTH: usize = 5000;
/// Maximum voice identifier length
const MAX_VOICE_ID_LENGTH: usize = 64;

/// Validate a streaming TTS request
pub fn validate_stream_request(text: &str, voice: Option<&str>) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.len() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }

    if let Some(voice) = voice {
        if !is_valid_voice_id(voice) {
            return Err(ApiError::InvalidInput(format!(
                "Invalid voice id: {}. Expected [A-Za-z0-9_-], max {} chars",
                voice, MAX_VOICE_ID_LENGTH
            )));
        }
    }

    Ok(())
}

/// Voice identifiers are registry keys, not free text
pub fn is_valid_voice_id(voice: &str) -> bool {
    !voice.is_empty()
        && voice.len() <= MAX_VOICE_ID_LENGTH
        && voice
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
