//! Request tokens
//!
//! Every activation gets a fresh token; only the newest one may open the
//! overlay once its fetch settles.

/// Identifies one activation attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: u64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token newer than every previous one
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Make every outstanding token stale
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_is_current() {
        let mut tokens = RequestTokens::new();
        let first = tokens.issue();
        assert!(tokens.is_current(first));
        let second = tokens.issue();
        assert!(second > first);
        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
    }

    #[test]
    fn test_invalidate() {
        let mut tokens = RequestTokens::new();
        let token = tokens.issue();
        tokens.invalidate();
        assert!(!tokens.is_current(token));
        let next = tokens.issue();
        assert!(tokens.is_current(next));
    }
}
