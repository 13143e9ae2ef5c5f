use super::*;

/// Why a field value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Empty,
    Malformed,
    TooShort { min: usize, actual: usize },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Malformed => write!(f, "malformed"),
            Self::TooShort { min, actual } => write!(f, "too short ({actual} < {min})"),
        }
    }
}

/// Shape check for an email address. Accepted values are returned trimmed.
#[derive(Debug, Clone)]
pub struct EmailRule {
    pattern: Regex,
}

impl EmailRule {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn check(&self, raw: &str) -> std::result::Result<String, FieldError> {
        let value = trim_input(raw);
        if value.is_empty() {
            return Err(FieldError::Empty);
        }
        // A match that cannot complete counts as a rejection.
        if !self.pattern.is_match(value).unwrap_or(false) {
            return Err(FieldError::Malformed);
        }
        Ok(value.to_string())
    }
}

/// Minimum-length check for free text. Length is counted in UTF-16 code
/// units after trimming, the way form scripts measure `value.length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRule {
    pub min_chars: usize,
}

impl MessageRule {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn check(&self, raw: &str) -> std::result::Result<String, FieldError> {
        let value = trim_input(raw);
        if value.is_empty() {
            return Err(FieldError::Empty);
        }
        let actual = value.encode_utf16().count();
        if actual < self.min_chars {
            return Err(FieldError::TooShort {
                min: self.min_chars,
                actual,
            });
        }
        Ok(value.to_string())
    }
}

/// Strips the characters a browser's `String.prototype.trim` strips: Unicode
/// whitespace except U+0085, plus the byte order mark.
fn trim_input(raw: &str) -> &str {
    raw.trim_matches(|c: char| (c.is_whitespace() && c != '\u{85}') || c == '\u{FEFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

    #[test]
    fn email_rule_trims_then_checks_shape() -> Result<()> {
        let rule = EmailRule::new(EMAIL)?;
        assert_eq!(rule.check("  user@example.com "), Ok("user@example.com".into()));
        assert_eq!(rule.check("   "), Err(FieldError::Empty));
        assert_eq!(rule.check("bad-email"), Err(FieldError::Malformed));
        assert_eq!(rule.check("a@b"), Err(FieldError::Malformed));
        assert_eq!(rule.check("a b@c.d"), Err(FieldError::Malformed));
        assert_eq!(rule.check("a@b.c"), Ok("a@b.c".into()));
        Ok(())
    }

    #[test]
    fn email_rule_strips_byte_order_marks() -> Result<()> {
        let rule = EmailRule::new(EMAIL)?;
        assert_eq!(rule.check("\u{FEFF}a@b.c"), Ok("a@b.c".into()));
        assert_eq!(rule.check("\u{FEFF}\u{A0} "), Err(FieldError::Empty));
        Ok(())
    }

    #[test]
    fn message_rule_counts_utf16_units() {
        let rule = MessageRule::new(10);
        assert_eq!(rule.check(""), Err(FieldError::Empty));
        assert_eq!(
            rule.check("  short  "),
            Err(FieldError::TooShort { min: 10, actual: 5 })
        );
        assert_eq!(rule.check("0123456789"), Ok("0123456789".into()));
        assert_eq!(
            rule.check("ééééééééé"),
            Err(FieldError::TooShort { min: 10, actual: 9 })
        );
        // each emoji is a surrogate pair
        assert_eq!(rule.check("😀😀😀😀😀"), Ok("😀😀😀😀😀".into()));
        assert_eq!(
            rule.check("😀😀😀😀"),
            Err(FieldError::TooShort { min: 10, actual: 8 })
        );
        // combining marks count on their own
        let decomposed = "e\u{301}".repeat(5);
        assert_eq!(rule.check(&decomposed), Ok(decomposed.clone()));
        assert_eq!(
            rule.check("\u{FEFF} curta \u{FEFF}"),
            Err(FieldError::TooShort { min: 10, actual: 5 })
        );
    }
}
