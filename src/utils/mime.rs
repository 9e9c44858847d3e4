//! MIME type detection utilities

/// Fallback MIME type for unknown payloads.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess MIME by file path or URL (extension-based)
pub fn guess_mime_from_path_or_url(path_or_url: &str) -> Option<String> {
    let path = path_or_url.split(['?', '#']).next().unwrap_or(path_or_url);
    mime_guess::from_path(path)
        .first_raw()
        .map(|s| s.to_string())
}

/// Guess by filename, falling back to `application/octet-stream`.
pub fn guess_mime(filename: Option<&str>) -> String {
    filename
        .and_then(guess_mime_from_path_or_url)
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_from_extension() {
        assert_eq!(guess_mime(Some("avatar.png")), "image/png");
        assert_eq!(
            guess_mime_from_path_or_url("https://cdn.test/report.pdf?sig=abc").as_deref(),
            Some("application/pdf")
        );
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(guess_mime(Some("blob.zzz-unknown")), OCTET_STREAM);
        assert_eq!(guess_mime(None), OCTET_STREAM);
    }
}
