use std::fmt;

/// Identifies one capture submission within a session.
///
/// Tokens increase monotonically; a detection outcome is only applied to the
/// pending capture carrying the same token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureToken(u64);

impl CaptureToken {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CaptureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture #{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase() {
        let a = CaptureToken::first();
        let b = a.next();
        assert!(b > a);
        assert_ne!(a, b);
        assert_eq!(b.value(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(CaptureToken::first().to_string(), "capture #1");
    }
}
