use std::fmt;

/// Pattern matcher for script-style regular expressions such as
/// `^[^\s@]+@[^\s@]+\.[^\s@]+$`.
#[derive(Debug, Clone)]
pub(crate) struct Regex {
    backend: fancy_regex::Regex,
}

impl Regex {
    pub(crate) fn new(pattern: &str) -> Result<Self, RegexError> {
        let backend = fancy_regex::Regex::new(pattern).map_err(RegexError::from)?;
        Ok(Self { backend })
    }

    pub(crate) fn is_match(&self, input: &str) -> Result<bool, RegexError> {
        self.backend.is_match(input).map_err(RegexError::from)
    }

    pub(crate) fn as_str(&self) -> &str {
        self.backend.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegexError {
    message: String,
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegexError {}

impl From<fancy_regex::Error> for RegexError {
    fn from(value: fancy_regex::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_pattern_matches_like_a_browser() -> Result<(), RegexError> {
        let regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?;
        assert!(regex.is_match("user@example.com")?);
        assert!(!regex.is_match("user@example")?);
        assert!(!regex.is_match("user example@x.com")?);
        assert!(!regex.is_match("@example.com")?);
        Ok(())
    }

    #[test]
    fn invalid_pattern_reports_backend_message() {
        let err = Regex::new("[unclosed").expect_err("pattern should not compile");
        assert!(!err.to_string().is_empty());
    }
}
