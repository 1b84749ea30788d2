use crate::ConfigError;
use regex::Regex;

/// Compiled exclude patterns
///
/// A URL is excluded when any pattern finds a match anywhere in it
/// (search semantics, not a full match).
#[derive(Debug, Clone, Default)]
pub struct ExcludeMatcher {
    patterns: Vec<Regex>,
}

impl ExcludeMatcher {
    /// Compiles every pattern, failing on the first invalid one
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p.as_ref(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns the first pattern that matches `url`
    pub fn find(&self, url: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|re| re.is_match(url))
            .map(Regex::as_str)
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.find(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
