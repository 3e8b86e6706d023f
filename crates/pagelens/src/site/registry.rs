// ABOUTME: Closed registry of site profiles built once from embedded JSON data.
// ABOUTME: Resolves a URL to the longest-matching profile, falling back to the generic profile.

use url::Url;

use crate::site::profile::SiteProfile;

/// Embedded JSON containing the built-in site profiles.
const BUILTIN_PROFILES_JSON: &str = include_str!("../../data/site_profiles.json");

/// Errors raised while building a registry from external data.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid site profile data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("site profile {0:?} lists no domains")]
    NoDomains(String),
}

/// Immutable set of site profiles plus the generic fallback.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    profiles: Vec<SiteProfile>,
    generic: SiteProfile,
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            generic: SiteProfile::generic(),
        }
    }
}

impl SiteRegistry {
    /// Creates a registry holding only the generic profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry built from the embedded profile data.
    ///
    /// Malformed embedded data is logged and leaves a generic-only registry.
    pub fn builtin() -> Self {
        match Self::from_json(BUILTIN_PROFILES_JSON) {
            Ok(registry) => registry,
            Err(err) => {
                tracing::error!(error = %err, "failed to load built-in site profiles");
                Self::new()
            }
        }
    }

    /// Parse a JSON array of profiles.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let profiles: Vec<SiteProfile> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for profile in profiles {
            if profile.domains.is_empty() {
                return Err(RegistryError::NoDomains(profile.name));
            }
            registry.register(profile);
        }
        Ok(registry)
    }

    /// Adds a profile, filling selector lists it leaves empty from the generic profile.
    pub fn register(&mut self, mut profile: SiteProfile) {
        profile.selectors.fill_from(&self.generic.selectors);
        for domain in &mut profile.domains {
            *domain = domain.trim().trim_start_matches("www.").to_ascii_lowercase();
        }
        self.profiles.push(profile);
    }

    /// Profile for `url`. Unknown hosts and unparsable URLs get the generic profile.
    pub fn resolve(&self, url: &str) -> &SiteProfile {
        match Url::parse(url.trim()).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) {
            Some(host) => self.resolve_host(&host),
            None => &self.generic,
        }
    }

    /// Profile for a bare hostname.
    pub fn resolve_host(&self, host: &str) -> &SiteProfile {
        let host = host.trim_end_matches('.');
        self.profiles
            .iter()
            .filter_map(|profile| profile.match_len(host).map(|len| (len, profile)))
            .max_by_key(|(len, _)| *len)
            .map(|(_, profile)| profile)
            .unwrap_or(&self.generic)
    }

    /// The fallback profile.
    pub fn generic(&self) -> &SiteProfile {
        &self.generic
    }

    /// Returns true if `profile` is this registry's fallback.
    pub fn is_generic(&self, profile: &SiteProfile) -> bool {
        std::ptr::eq(profile, &self.generic) || profile.name == self.generic.name
    }

    /// Registered site profiles, excluding the generic fallback.
    pub fn profiles(&self) -> &[SiteProfile] {
        &self.profiles
    }

    /// Returns the number of registered site profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if only the generic profile is available.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::profile::SelectorSpec;

    #[test]
    fn builtin_registry_loads() {
        let registry = SiteRegistry::builtin();
        assert!(registry.len() >= 8, "got {}", registry.len());
    }

    #[test]
    fn every_profile_has_non_empty_selector_lists() {
        let registry = SiteRegistry::builtin();
        for profile in registry.profiles().iter().chain([registry.generic()]) {
            for (field, list) in profile.selectors.fields() {
                assert!(!list.is_empty(), "{} has no {} selectors", profile.name, field);
            }
        }
    }

    #[test]
    fn known_article_urls_resolve_to_site_profiles() {
        let registry = SiteRegistry::builtin();
        let cases = [
            ("https://qiita.com/someone/items/0123456789abcdef", "qiita"),
            ("https://zenn.dev/someone/articles/rust-async", "zenn"),
            ("https://note.com/someone/n/n0123456789ab", "note"),
            ("https://medium.com/@someone/post-1234", "medium"),
            ("https://dev.to/someone/a-post-5kd2", "devto"),
            ("https://someone.hatenablog.com/entry/2024/01/01/000000", "hatena-blog"),
            ("https://dev.classmethod.jp/articles/some-article/", "classmethod"),
            ("https://WWW.Qiita.com/tags/rust", "qiita"),
        ];
        for (url, name) in cases {
            let profile = registry.resolve(url);
            assert_eq!(profile.name, name, "{url}");
            assert!(!registry.is_generic(profile));
        }
    }

    #[test]
    fn unknown_hosts_and_garbage_get_generic() {
        let registry = SiteRegistry::builtin();
        for url in [
            "https://example.com/post",
            "not a url",
            "",
            "https://notqiita.com/x",
            "mailto:someone@example.com",
        ] {
            let profile = registry.resolve(url);
            assert!(registry.is_generic(profile), "{url}");
            assert!(!profile.js_required);
        }
    }

    #[test]
    fn longest_domain_wins() {
        let json = r#"[
            {"name": "classmethod-all", "domains": ["classmethod.jp"], "selectors": {"title": ["h1.any"]}},
            {"name": "classmethod-dev", "domains": ["dev.classmethod.jp"], "selectors": {"title": ["h1.dev"]}}
        ]"#;
        let registry = SiteRegistry::from_json(json).unwrap();
        assert_eq!(registry.resolve("https://dev.classmethod.jp/a").name, "classmethod-dev");
        assert_eq!(registry.resolve("https://www.classmethod.jp/a").name, "classmethod-all");
    }

    #[test]
    fn omitted_lists_are_filled_from_generic() {
        let json = r#"[{"name": "tiny", "domains": ["tiny.test"], "selectors": {"title": ["h1.headline"]}}]"#;
        let registry = SiteRegistry::from_json(json).unwrap();
        let profile = registry.resolve("https://tiny.test/a");
        assert_eq!(profile.selectors.title, vec![SelectorSpec::css("h1.headline")]);
        assert_eq!(profile.selectors.content, registry.generic().selectors.content);
        assert_eq!(profile.wait_time, std::time::Duration::from_millis(1000));
    }

    #[test]
    fn from_json_rejects_bad_data() {
        assert!(matches!(
            SiteRegistry::from_json("{not json"),
            Err(RegistryError::Parse(_))
        ));
        assert!(matches!(
            SiteRegistry::from_json(r#"[{"name": "x", "selectors": {}}]"#),
            Err(RegistryError::NoDomains(name)) if name == "x"
        ));
    }

    #[test]
    fn script_heavy_sites_are_flagged() {
        let registry = SiteRegistry::builtin();
        let note = registry.resolve("https://note.com/a/n/b");
        assert!(note.js_required);
        assert!(note.scroll_to_load);
        assert_eq!(note.wait_time, std::time::Duration::from_millis(4000));
    }
}
