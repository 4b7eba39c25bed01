//! # Config Resolver
//!
//! Resolves raw input identifiers (button codes, hat positions, topic keys)
//! to their configured mappings.
//!
//! Lookups walk the configured lists in order and the first match wins.
//! Every result, including "not found", is memoized per identifier so the
//! per-event cost after the first lookup is a single hash probe. The caches
//! live for one session; the configuration is immutable once loaded, so a
//! cached result never goes stale.

use std::collections::HashMap;

use crate::config::{ButtonMapping, Config, HatMapping, TopicMapping};

/// Returns the first element of `items` satisfying `predicate`.
///
/// Absence is a normal outcome, not an error.
pub fn find_item<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> Option<&T> {
    items.iter().find(|item| predicate(item))
}

/// Memoizing lookup table over the loaded configuration.
///
/// Owns the configuration for the duration of a session. Not thread-safe
/// and does not need to be: the polling loop is the only caller.
#[derive(Debug)]
pub struct MappingResolver {
    config: Config,
    buttons: HashMap<u16, Option<ButtonMapping>>,
    hats: HashMap<(i32, i32), Option<HatMapping>>,
    topics: HashMap<String, Option<TopicMapping>>,
}

impl MappingResolver {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            buttons: HashMap::new(),
            hats: HashMap::new(),
            topics: HashMap::new(),
        }
    }

    /// The configuration this resolver was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a button code to its configured mapping, if any
    pub fn find_button_item(&mut self, button: u16) -> Option<&ButtonMapping> {
        self.buttons
            .entry(button)
            .or_insert_with(|| {
                find_item(&self.config.controller.buttons, |item| item.key == button).cloned()
            })
            .as_ref()
    }

    /// Resolve a hat (x, y) position to its configured mapping, if any
    pub fn find_hat_item(&mut self, hat: (i32, i32)) -> Option<&HatMapping> {
        self.hats
            .entry(hat)
            .or_insert_with(|| {
                find_item(&self.config.controller.hats, |item| {
                    item.x == hat.0 && item.y == hat.1
                })
                .cloned()
            })
            .as_ref()
    }

    /// Resolve a topic key to its configured broker topic, if any
    pub fn find_topic(&mut self, key: &str) -> Option<&TopicMapping> {
        if !self.topics.contains_key(key) {
            let resolved =
                find_item(&self.config.mqtt.topics, |item| item.key == key).cloned();
            self.topics.insert(key.to_string(), resolved);
        }
        self.topics.get(key).and_then(|entry| entry.as_ref())
    }
}
