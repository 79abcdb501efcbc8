use crate::errors::AuthError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;

/// Validated 1-based pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Build a cursor from raw query parameters. Absent or empty values
    /// fall back to the defaults; anything that does not parse as a
    /// positive integer is `InvalidNumber`.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Result<Self, AuthError> {
        Ok(PageRequest {
            page: parse_positive(page, DEFAULT_PAGE)?,
            limit: parse_positive(limit, DEFAULT_LIMIT)?,
        })
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1).saturating_mul(self.limit)) as usize
    }
}

fn parse_positive(raw: Option<&str>, default: u64) -> Result<u64, AuthError> {
    match raw {
        None => Ok(default),
        Some(s) if s.is_empty() => Ok(default),
        Some(s) => match s.parse::<u64>() {
            Ok(v) if v >= 1 => Ok(v),
            _ => Err(AuthError::InvalidNumber),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let page = PageRequest::from_raw(None, None).unwrap();
        assert_eq!(page, PageRequest { page: 1, limit: 20 });
    }

    #[test]
    fn test_defaults_when_empty() {
        let page = PageRequest::from_raw(Some(""), Some("")).unwrap();
        assert_eq!(page, PageRequest { page: 1, limit: 20 });
    }

    #[test]
    fn test_explicit_values() {
        let page = PageRequest::from_raw(Some("3"), Some("50")).unwrap();
        assert_eq!(page, PageRequest { page: 3, limit: 50 });
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(
            PageRequest::from_raw(Some("abc"), None).unwrap_err(),
            AuthError::InvalidNumber
        );
        assert_eq!(
            PageRequest::from_raw(None, Some("-5")).unwrap_err(),
            AuthError::InvalidNumber
        );
    }

    #[test]
    fn test_rejects_zero() {
        assert_eq!(
            PageRequest::from_raw(Some("0"), None).unwrap_err(),
            AuthError::InvalidNumber
        );
        assert_eq!(
            PageRequest::from_raw(None, Some("0")).unwrap_err(),
            AuthError::InvalidNumber
        );
    }

    #[test]
    fn test_offset_math() {
        let page = PageRequest::from_raw(Some("1"), Some("20")).unwrap();
        assert_eq!(page.offset(), 0);

        let page = PageRequest::from_raw(Some("2"), Some("10")).unwrap();
        assert_eq!(page.offset(), 10);

        let page = PageRequest::from_raw(Some("4"), Some("25")).unwrap();
        assert_eq!(page.offset(), 75);
    }
}
