//! User-facing strings, rendered from the bundled Fluent resource.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use tracing::warn;
use unic_langid::LanguageIdentifier;

const EN_RESOURCE: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the bot replies
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Create a manager with the bundled English messages
    pub fn new() -> Result<Self> {
        Self::from_source("en", EN_RESOURCE.to_string())
    }

    /// Create a manager from Fluent source text
    pub fn from_source(locale: &str, source: String) -> Result<Self> {
        let locale: LanguageIdentifier = locale.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Replies are compared verbatim, no bidi isolation marks
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source)
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate Fluent messages: {errors:?}"))?;

        Ok(Self { bundle })
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(
                args.iter()
                    .map(|(k, v)| (*k, FluentValue::from(v.to_string()))),
            )
        });

        let mut errors = vec![];
        let value = self
            .bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting reported errors");
        }

        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message(key, Some(&args_map))
    }

    /// Convenience function to get a localized message
    pub fn t(&self, key: &str) -> String {
        self.get_message(key, None)
    }

    /// Convenience function to get a localized message with arguments
    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.get_message_with_args(key, args)
    }
}
