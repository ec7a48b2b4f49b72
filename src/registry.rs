use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::{BackendError, CodecConfigParser, FourCc, VideoConfiguration};

/// One decoder backend as seen by the host: identity, capabilities and a
/// factory for decoder instances of type `D`.
pub trait DecoderPlugin<D>: Send + Sync {
    /// Registry key, e.g. `vcat.dav1d`.
    fn id(&self) -> &str;

    fn version(&self) -> String;

    fn display_name(&self) -> String {
        format!("{}-{}", self.id(), self.version())
    }

    /// The single MIME type this plugin decodes.
    fn mime_type(&self) -> &str;

    fn supported_profiles(&self) -> &[&str];

    fn supports(&self, mime_type: &str) -> bool {
        self.mime_type() == mime_type
    }

    fn supports_profile(&self, mime_type: &str, profile: &str) -> bool {
        self.supports(mime_type) && self.supported_profiles().contains(&profile)
    }

    /// Open-ended capability query (bit depths, tiers, CPU features).
    fn extended(&self, _key: &str) -> Vec<String> {
        Vec::new()
    }

    /// `threads` below 1 is treated as 1.
    fn create(&self, threads: u32, config: Option<&VideoConfiguration>) -> Result<D, BackendError>;

    /// Parser for a sample entry the container layer does not understand.
    fn config_parser(&self) -> Option<Box<dyn CodecConfigParser>> {
        None
    }
}

/// Plugins keyed by id. The first registration of an id wins; later ones
/// are refused.
pub struct DecoderRegistry<D> {
    plugins: Vec<Box<dyn DecoderPlugin<D>>>,
}

impl<D> Default for DecoderRegistry<D> {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }
}

impl<D> DecoderRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id is already taken.
    pub fn register<P>(&mut self, plugin: P) -> bool
    where
        P: DecoderPlugin<D> + 'static,
    {
        if self.get(plugin.id()).is_some() {
            debug!(id = plugin.id(), "decoder plugin already registered; keeping first");
            return false;
        }
        debug!(id = plugin.id(), mime = plugin.mime_type(), "decoder plugin registered");
        self.plugins.push(Box::new(plugin));
        true
    }

    pub fn get(&self, id: &str) -> Option<&dyn DecoderPlugin<D>> {
        self.plugins
            .iter()
            .find(|plugin| plugin.id() == id)
            .map(AsRef::as_ref)
    }

    /// Registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &dyn DecoderPlugin<D>> {
        self.plugins.iter().map(AsRef::as_ref)
    }

    pub fn plugins_for_mime<'a>(
        &'a self,
        mime_type: &'a str,
    ) -> impl Iterator<Item = &'a dyn DecoderPlugin<D>> + 'a {
        self.plugins().filter(move |plugin| plugin.supports(mime_type))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Config parsers keyed by the sample entry they handle.
    pub fn non_standard_parsers(&self) -> BTreeMap<FourCc, Box<dyn CodecConfigParser>> {
        self.plugins
            .iter()
            .filter_map(|plugin| plugin.config_parser())
            .map(|parser| (parser.sample_entry(), parser))
            .collect()
    }

    /// Looks the plugin up and builds a decoder with at least one thread.
    pub fn create(
        &self,
        id: &str,
        threads: u32,
        config: Option<&VideoConfiguration>,
    ) -> Result<D, BackendError> {
        let plugin = self.get(id).ok_or_else(|| {
            BackendError::UnsupportedConfig(format!("no decoder plugin registered as {id}"))
        })?;
        plugin.create(threads.max(1), config)
    }
}

impl<D> fmt::Debug for DecoderRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|plugin| plugin.id().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VvcConfigParser;

    struct Stub {
        id: &'static str,
        mime: &'static str,
        version: &'static str,
        with_parser: bool,
    }

    impl Stub {
        fn new(id: &'static str, mime: &'static str, version: &'static str) -> Self {
            Self {
                id,
                mime,
                version,
                with_parser: false,
            }
        }
    }

    impl DecoderPlugin<(String, u32)> for Stub {
        fn id(&self) -> &str {
            self.id
        }

        fn version(&self) -> String {
            self.version.to_string()
        }

        fn mime_type(&self) -> &str {
            self.mime
        }

        fn supported_profiles(&self) -> &[&str] {
            &["main"]
        }

        fn create(
            &self,
            threads: u32,
            _config: Option<&VideoConfiguration>,
        ) -> Result<(String, u32), BackendError> {
            Ok((self.display_name(), threads))
        }

        fn config_parser(&self) -> Option<Box<dyn CodecConfigParser>> {
            self.with_parser
                .then(|| Box::new(VvcConfigParser) as Box<dyn CodecConfigParser>)
        }
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = DecoderRegistry::new();
        assert!(registry.register(Stub::new("vcat.dav1d", "video/av01", "1.0")));
        assert!(!registry.register(Stub::new("vcat.dav1d", "video/av01", "2.0")));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("vcat.dav1d").map(|p| p.version()),
            Some("1.0".to_string())
        );
    }

    #[test]
    fn unknown_id_is_not_registered() {
        let registry = DecoderRegistry::<(String, u32)>::new();
        assert!(registry.is_empty());
        assert!(registry.get("vcat.vvdec").is_none());
        assert!(matches!(
            registry.create("vcat.vvdec", 2, None),
            Err(BackendError::UnsupportedConfig(_))
        ));
    }

    #[test]
    fn lookup_by_mime_keeps_registration_order() {
        let mut registry = DecoderRegistry::new();
        registry.register(Stub::new("b", "video/vvc", "1"));
        registry.register(Stub::new("a", "video/av01", "1"));
        registry.register(Stub::new("c", "video/vvc", "1"));
        let ids: Vec<_> = registry
            .plugins_for_mime("video/vvc")
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(registry.plugins().count(), 3);
    }

    #[test]
    fn create_clamps_threads_and_names_decoder() {
        let mut registry = DecoderRegistry::new();
        registry.register(Stub::new("vcat.vvdec", "video/vvc", "3.0.0"));
        let (name, threads) = registry.create("vcat.vvdec", 0, None).unwrap();
        assert_eq!(name, "vcat.vvdec-3.0.0");
        assert_eq!(threads, 1);
    }

    #[test]
    fn profile_support_requires_matching_mime() {
        let plugin = Stub::new("vcat.dav1d", "video/av01", "1");
        assert!(plugin.supports_profile("video/av01", "main"));
        assert!(!plugin.supports_profile("video/av01", "high"));
        assert!(!plugin.supports_profile("video/vvc", "main"));
        assert!(plugin.extended("bitDepths").is_empty());
    }

    #[test]
    fn parsers_are_keyed_by_sample_entry() {
        let mut registry = DecoderRegistry::new();
        registry.register(Stub::new("vcat.dav1d", "video/av01", "1"));
        registry.register(Stub {
            with_parser: true,
            ..Stub::new("vcat.vvdec", "video/vvc", "1")
        });
        let parsers = registry.non_standard_parsers();
        assert_eq!(parsers.len(), 1);
        let parser = &parsers[&FourCc::new(b"vvc1")];
        assert_eq!(parser.config_box().to_string(), "vvcC");
    }
}
