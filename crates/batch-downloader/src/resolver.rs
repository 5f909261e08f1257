//! Maps manifest links to provider download endpoints.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ProviderEndpoints;
use crate::error::UnsupportedHost;

static PILLOWCASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pillowcase\.su/f/([a-zA-Z0-9]+)").expect("valid pillowcase pattern"));
static FROSTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"music\.froste\.lol/song/([a-zA-Z0-9]+)").expect("valid froste pattern")
});

/// Asset hosts the downloader knows how to fetch from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `pillowcase.su/f/<id>` share links.
    Pillowcase,
    /// `music.froste.lol/song/<id>` song pages.
    Froste,
}

impl Provider {
    const ALL: [Provider; 2] = [Provider::Pillowcase, Provider::Froste];

    fn pattern(self) -> &'static Regex {
        match self {
            Provider::Pillowcase => &*PILLOWCASE_RE,
            Provider::Froste => &*FROSTE_RE,
        }
    }

    /// Extract this provider's item id from `url`.
    pub fn extract_id(self, url: &str) -> Option<String> {
        self.pattern()
            .captures(url)
            .map(|caps| caps[1].to_string())
    }

    /// Find the provider and item id for `url`.
    pub fn detect(url: &str) -> Option<(Provider, String)> {
        Self::ALL
            .into_iter()
            .find_map(|provider| provider.extract_id(url).map(|id| (provider, id)))
    }
}

/// Download endpoint plus the id used as a filename fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub provider: Provider,
    pub endpoint: String,
    pub fallback_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    endpoints: ProviderEndpoints,
}

impl AssetResolver {
    pub fn new(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }

    pub fn resolve(&self, url: &str) -> Result<ResolvedAsset, UnsupportedHost> {
        let (provider, id) = Provider::detect(url).ok_or_else(|| UnsupportedHost {
            url: url.to_string(),
        })?;
        let template = match provider {
            Provider::Pillowcase => &self.endpoints.pillowcase,
            Provider::Froste => &self.endpoints.froste,
        };
        Ok(ResolvedAsset {
            provider,
            endpoint: template.replace("{id}", &id),
            fallback_id: id,
        })
    }
}
