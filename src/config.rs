//! Expansion limits.
//!
//! Per-wiki configuration is not part of this module: it comes from the
//! wiki’s site information (see [`crate::siteinfo`]).

use serde::Deserialize;

/// Tunable limits for an expansion.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Limits {
    /// The maximum template call depth.
    pub recursion_limit: usize,
    /// The maximum size, in bytes, of any single expanded argument or
    /// template name.
    pub max_arg_size: usize,
    /// The maximum number of redirects to follow when fetching a page.
    pub max_redirects: usize,
    /// The number of parsed template bodies kept by the shared parse cache.
    pub parse_cache_size: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            max_arg_size: 256 * 1024,
            max_redirects: 5,
            parse_cache_size: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config() {
        let limits: Limits = serde_json::from_str(r#"{"recursion_limit": 40}"#).unwrap();
        assert_eq!(
            limits,
            Limits {
                recursion_limit: 40,
                ..Limits::default()
            }
        );
    }
}
