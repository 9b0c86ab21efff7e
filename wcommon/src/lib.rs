//! Shared values used across the weave workspace crates.
//!
//! ```rust
//! use wcommon::{GenerationOptions, MetadataMap, RunId, SessionId};
//!
//! let session = SessionId::from("session-1");
//! let run = RunId::new("run-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("tenant".to_string(), "acme".into());
//!
//! let options = GenerationOptions::default().with_temperature(0.3).with_max_tokens(256);
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(run.to_string(), "run-1");
//! assert_eq!(options.max_tokens, Some(256));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use wcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Metadata maps and identifier newtypes shared by requests, runs, and tools.

    use std::fmt::{Display, Formatter};

    /// JSON-valued metadata attached to messages, chunks, and tool contexts.
    pub type MetadataMap = serde_json::Map<String, serde_json::Value>;

    macro_rules! string_id {
        ($(#[$doc:meta])* $name:ident) => {
            $(#[$doc])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        };
    }

    string_id!(
        /// Caller-level conversation identifier.
        SessionId
    );

    string_id!(
        /// Identifier correlating log lines across one request chain.
        TraceId
    );

    string_id!(
        /// Identifier of a single orchestration run.
        RunId
    );
}

pub mod model {
    //! Generation settings forwarded to chat models.
    //!
    //! ```rust
    //! use wcommon::GenerationOptions;
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128)
    //!     .with_stop_sequence("END");
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.stop_sequences, vec!["END".to_string()]);
    //! ```

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
        pub top_p: Option<f32>,
        pub stop_sequences: Vec<String>,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_top_p(mut self, top_p: f32) -> Self {
            self.top_p = Some(top_p);
            self
        }

        pub fn with_stop_sequence(mut self, stop: impl Into<String>) -> Self {
            self.stop_sequences.push(stop.into());
            self
        }

        /// Returns a description of the first out-of-range setting, if any.
        pub fn check(&self) -> Option<&'static str> {
            if self.max_tokens == Some(0) {
                return Some("max_tokens must be greater than zero");
            }

            if let Some(temperature) = self.temperature
                && !(0.0..=2.0).contains(&temperature)
            {
                return Some("temperature must be in the inclusive range 0.0..=2.0");
            }

            if let Some(top_p) = self.top_p
                && !(0.0..=1.0).contains(&top_p)
            {
                return Some("top_p must be in the inclusive range 0.0..=1.0");
            }

            None
        }
    }
}

pub mod registry {
    //! Name-keyed registry that keeps insertion order for stable listings.
    //!
    //! ```rust
    //! use wcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("beta".to_string(), 2_u32);
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["beta", "alpha"]);
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
        order: Vec<K>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
                order: Vec::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash + Clone,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            let previous = self.items.insert(key.clone(), value);
            if previous.is_none() {
                self.order.push(key);
            }
            previous
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            let removed = self.items.remove(key)?;
            self.order.retain(|existing| {
                let existing: &Q = existing.borrow();
                existing != key
            });
            Some(removed)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.order.iter()
        }

        /// Values in insertion order.
        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.order.iter().filter_map(|key| self.items.get(key))
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::{MetadataMap, RunId, SessionId, TraceId};
pub use future::BoxFuture;
pub use model::GenerationOptions;
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::{GenerationOptions, Registry, RunId, SessionId, TraceId};

    #[test]
    fn id_newtypes_round_trip_strings() {
        let session = SessionId::new("session-1");
        let trace = TraceId::from("trace-1");
        let run = RunId::from("run-1".to_string());

        assert_eq!(session.as_str(), "session-1");
        assert_eq!(trace.to_string(), "trace-1");
        assert_eq!(run.as_str(), "run-1");
    }

    #[test]
    fn generation_options_check_flags_out_of_range_values() {
        assert_eq!(GenerationOptions::default().check(), None);
        assert!(
            GenerationOptions::default()
                .with_max_tokens(0)
                .check()
                .is_some()
        );
        assert!(
            GenerationOptions::default()
                .with_temperature(2.5)
                .check()
                .is_some()
        );
        assert!(GenerationOptions::default().with_top_p(1.5).check().is_some());
        assert_eq!(
            GenerationOptions::default()
                .with_temperature(0.7)
                .with_top_p(0.9)
                .check(),
            None
        );
    }

    #[test]
    fn registry_keeps_insertion_order_across_removals() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert("alpha".to_string(), 1_u32);
        registry.insert("beta".to_string(), 2_u32);
        registry.insert("gamma".to_string(), 3_u32);
        assert_eq!(registry.insert("beta".to_string(), 20), Some(2));

        assert_eq!(registry.remove("alpha"), Some(1));
        assert_eq!(registry.values().copied().collect::<Vec<_>>(), vec![20, 3]);
        assert!(registry.contains_key("gamma"));
        assert_eq!(registry.len(), 2);
    }
}
