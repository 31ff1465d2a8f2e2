use std::fmt;

use crate::error::ReportError;
use crate::range::SliceWidth;
use crate::resolve::ResolutionRule;

pub const URL_VAR: &str = "ZENDESK_URL";
pub const EMAIL_VAR: &str = "ZENDESK_EMAIL";
pub const TOKEN_VAR: &str = "ZENDESK_TOKEN";

#[derive(Clone)]
pub struct Credentials {
    pub base_url: String,
    pub email: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ReportError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ReportError> {
        let require = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ReportError::MissingEnv(name))
        };

        Ok(Self {
            base_url: require(URL_VAR)?,
            email: require(EMAIL_VAR)?,
            token: require(TOKEN_VAR)?,
        })
    }
}

/// Knobs that shape collection, independent of where the tickets come from.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub width: SliceWidth,
    pub cloud_tag: String,
    pub rule: ResolutionRule,
    pub concurrency: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            width: SliceWidth::Day,
            cloud_tag: crate::resolve::DEFAULT_CLOUD_TAG.to_string(),
            rule: ResolutionRule::Chronological,
            concurrency: 4,
        }
    }
}
