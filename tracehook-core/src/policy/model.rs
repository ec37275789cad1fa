//! The resolved, read-only instrumentation policy.
//!
//! An [`InstrumentationPolicy`] is built once per load and then shared across
//! threads behind an `Arc`. Nothing here exposes mutation after construction.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::builtins::BuiltInFeatureSet;

/// Category assigned to classes declared without a `type`
pub const OTHER_TYPE: &str = "OTHER";

/// Identity of a traced method within its class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub name: String,
    /// Empty means "any overload"
    pub signature: String,
}

impl MethodKey {
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }
}

/// One traced method signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodRule {
    name: String,
    signature: String,
    threshold_ms: u64,
}

impl MethodRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// True when the rule applies to every overload of the method
    pub fn matches_any_signature(&self) -> bool {
        self.signature.is_empty()
    }

    pub fn threshold_ms(&self) -> u64 {
        self.threshold_ms
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

/// Instrumentation parameters for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRule {
    type_tag: String,
    default_threshold_ms: u64,
    #[serde(serialize_with = "serialize_methods")]
    methods: BTreeMap<MethodKey, MethodRule>,
}

impl ClassRule {
    pub(crate) fn new(type_tag: impl Into<String>, default_threshold_ms: u64) -> Self {
        Self {
            type_tag: type_tag.into(),
            default_threshold_ms,
            methods: BTreeMap::new(),
        }
    }

    /// Add a method rule. The first declaration of a `(name, signature)` pair wins.
    pub(crate) fn add_method(
        &mut self,
        name: impl Into<String>,
        signature: impl Into<String>,
        threshold_ms: u64,
    ) -> bool {
        use std::collections::btree_map::Entry;

        let key = MethodKey::new(name, signature);
        match self.methods.entry(key) {
            Entry::Vacant(entry) => {
                let key = entry.key();
                let rule = MethodRule {
                    name: key.name.clone(),
                    signature: key.signature.clone(),
                    threshold_ms,
                };
                entry.insert(rule);
                true
            }
            Entry::Occupied(entry) => {
                debug!(
                    method = %entry.key().name,
                    signature = %entry.key().signature,
                    "Keeping first declaration of duplicate method rule"
                );
                false
            }
        }
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn default_threshold_ms(&self) -> u64 {
        self.default_threshold_ms
    }

    pub fn default_threshold(&self) -> Duration {
        Duration::from_millis(self.default_threshold_ms)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodRule> {
        self.methods.values()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Exact `(name, signature)` match, falling back to the any-overload rule.
    pub fn method_rule(&self, name: &str, signature: &str) -> Option<&MethodRule> {
        self.methods
            .get(&MethodKey::new(name, signature))
            .or_else(|| self.methods.get(&MethodKey::new(name, "")))
    }
}

fn serialize_methods<S>(
    methods: &BTreeMap<MethodKey, MethodRule>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(methods.values())
}

/// Immutable snapshot of built-in toggles plus the class rule table.
///
/// A class that is absent from the table is never instrumented.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InstrumentationPolicy {
    builtins: BuiltInFeatureSet,
    classes: BTreeMap<String, ClassRule>,
}

impl InstrumentationPolicy {
    pub(crate) fn new(builtins: BuiltInFeatureSet, classes: BTreeMap<String, ClassRule>) -> Self {
        Self { builtins, classes }
    }

    /// Valid policy with all built-ins disabled and no class rules
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && !self.builtins.enabled()
    }

    pub fn builtins(&self) -> &BuiltInFeatureSet {
        &self.builtins
    }

    pub fn class_rule(&self, class_name: &str) -> Option<&ClassRule> {
        self.classes.get(class_name)
    }

    pub fn is_instrumented(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Class rules ordered by class name
    pub fn classes(&self) -> impl Iterator<Item = (&str, &ClassRule)> {
        self.classes.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn method_count(&self) -> usize {
        self.classes.values().map(ClassRule::method_count).sum()
    }

    pub fn method_rule(&self, class_name: &str, method: &str, signature: &str) -> Option<&MethodRule> {
        self.class_rule(class_name)?.method_rule(method, signature)
    }

    /// Resolved threshold for a traced method, `None` if the method is not traced.
    pub fn method_threshold(&self, class_name: &str, method: &str, signature: &str) -> Option<Duration> {
        self.method_rule(class_name, method, signature)
            .map(MethodRule::threshold)
    }
}
