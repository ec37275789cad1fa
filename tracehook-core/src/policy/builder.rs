//! Policy builder - resolves the parsed document into an [`InstrumentationPolicy`]
//!
//! Resolution rules:
//! - A missing root or instrumentation block yields the empty policy.
//! - Built-ins are resolved block by block; a missing or disabled `BuiltIn`
//!   block disables everything beneath it without looking further.
//! - Classes are visited in document order. Disabled or unnamed classes are
//!   skipped. The first declaration of a class name fixes its type and
//!   threshold; later declarations only contribute methods.
//! - Methods inherit the owning rule's threshold unless they set their own.

use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::builtins::{
    BuiltInFeatureSet, BuiltInFeatureSetBuilder, DEFAULT_LOGGING_THRESHOLD,
    DEFAULT_QUERY_PLAN_THRESHOLD_MS,
};
use super::document::PolicyDocument;
use super::model::{ClassRule, InstrumentationPolicy, OTHER_TYPE};
use super::tree::{feature_enabled, ElementExt};
use crate::error::Result;
use crate::guard;

pub const ROOT_TAG: &str = "ApplicationInsightsAgent";
pub const INSTRUMENTATION_TAG: &str = "Instrumentation";
pub const CLASS_TAG: &str = "Class";
pub const METHOD_TAG: &str = "Method";

pub const BUILT_IN_TAG: &str = "BuiltIn";
pub const HTTP_TAG: &str = "HTTP";
pub const W3C_ATTRIBUTE: &str = "W3C";
pub const W3C_BACK_COMPAT_ATTRIBUTE: &str = "enableW3CBackCompat";
pub const JDBC_TAG: &str = "JDBC";
pub const LOGGING_TAG: &str = "Logging";
pub const LOGGING_THRESHOLD_ATTRIBUTE: &str = "threshold";
pub const CACHE_CLIENT_TAG: &str = "Jedis";
pub const QUERY_PLAN_THRESHOLD_TAG: &str = "MaxStatementQueryLimitInMS";

pub const NAME_ATTRIBUTE: &str = "name";
pub const TYPE_ATTRIBUTE: &str = "type";
pub const THRESHOLD_ATTRIBUTE: &str = "thresholdInMS";
pub const SIGNATURE_ATTRIBUTE: &str = "signature";

pub struct PolicyBuilder;

impl PolicyBuilder {
    /// Parse and resolve a loaded document.
    ///
    /// An empty document yields the empty policy. Any failure (malformed
    /// markup, a panic while walking the tree) is returned as an error; the
    /// caller must treat it as "no policy produced".
    pub fn build_document(document: &PolicyDocument) -> Result<InstrumentationPolicy> {
        match document.parse()? {
            Some(parsed) => Self::build_guarded(&parsed),
            None => Ok(InstrumentationPolicy::empty()),
        }
    }

    /// Resolve a parsed tree, containing panics raised while walking it.
    pub fn build_guarded(document: &Document<'_>) -> Result<InstrumentationPolicy> {
        Self::guarded(|| Self::build(document))
    }

    fn guarded(resolve: impl FnOnce() -> InstrumentationPolicy) -> Result<InstrumentationPolicy> {
        Ok(guard::catch_recoverable(resolve)?)
    }

    /// Resolve a parsed tree into a policy.
    pub fn build(document: &Document<'_>) -> InstrumentationPolicy {
        let Some(root) = document
            .descendants()
            .find(|node| node.is_element() && node.tag_name().name() == ROOT_TAG)
        else {
            debug!("No <{}> element in policy document", ROOT_TAG);
            return InstrumentationPolicy::empty();
        };

        let Some(instrumentation) = root.first_element(INSTRUMENTATION_TAG) else {
            debug!("No <{}> element in policy document", INSTRUMENTATION_TAG);
            return InstrumentationPolicy::empty();
        };

        let builtins = Self::resolve_builtins(instrumentation);
        let classes = Self::resolve_classes(instrumentation);
        let policy = InstrumentationPolicy::new(builtins, classes);

        debug!(
            "Resolved instrumentation policy: {} classes, {} methods, built-ins {:?}",
            policy.class_count(),
            policy.method_count(),
            policy.builtins().enabled_features()
        );

        policy
    }

    fn resolve_builtins(instrumentation: Node<'_, '_>) -> BuiltInFeatureSet {
        let Some(built_in) = instrumentation.first_element(BUILT_IN_TAG) else {
            trace!("No <{}> block, built-in instrumentation disabled", BUILT_IN_TAG);
            return BuiltInFeatureSet::disabled();
        };

        if !built_in.is_enabled() {
            trace!("<{}> block disabled", BUILT_IN_TAG);
            return BuiltInFeatureSet::disabled();
        }

        let http = built_in.first_element(HTTP_TAG);
        let w3c = http.map_or(false, |e| e.bool_attribute(W3C_ATTRIBUTE, false));
        let w3c_back_compat = http.map_or(true, |e| e.bool_attribute(W3C_BACK_COMPAT_ATTRIBUTE, true));

        let logging = built_in.first_element(LOGGING_TAG);
        let logging_threshold = logging.map_or_else(
            || DEFAULT_LOGGING_THRESHOLD.to_string(),
            |e| e.string_attribute(LOGGING_THRESHOLD_ATTRIBUTE, DEFAULT_LOGGING_THRESHOLD),
        );

        let query_plan_threshold_ms = built_in
            .first_element(QUERY_PLAN_THRESHOLD_TAG)
            .and_then(|e| e.u64_text())
            .unwrap_or(DEFAULT_QUERY_PLAN_THRESHOLD_MS);

        BuiltInFeatureSetBuilder::new()
            .enabled(true)
            .http(feature_enabled(http), w3c, w3c_back_compat)
            .jdbc(feature_enabled(built_in.first_element(JDBC_TAG)))
            .logging(feature_enabled(logging), logging_threshold)
            .cache_client(feature_enabled(built_in.first_element(CACHE_CLIENT_TAG)))
            .query_plan_threshold_ms(query_plan_threshold_ms)
            .build()
    }

    fn resolve_classes(instrumentation: Node<'_, '_>) -> BTreeMap<String, ClassRule> {
        let mut classes: BTreeMap<String, ClassRule> = BTreeMap::new();

        for class_node in instrumentation.elements_named(CLASS_TAG) {
            if !class_node.is_enabled() {
                continue;
            }

            let Some(class_name) = class_node.non_empty_attribute(NAME_ATTRIBUTE) else {
                continue;
            };

            let rule = classes.entry(class_name.to_string()).or_insert_with(|| {
                ClassRule::new(
                    class_node.string_attribute(TYPE_ATTRIBUTE, OTHER_TYPE),
                    class_node.u64_attribute(THRESHOLD_ATTRIBUTE, 0),
                )
            });

            Self::add_methods(rule, class_node);
        }

        classes
    }

    fn add_methods(rule: &mut ClassRule, class_node: Node<'_, '_>) {
        for method_node in class_node.elements_named(METHOD_TAG) {
            if !method_node.is_enabled() {
                continue;
            }

            let Some(method_name) = method_node.non_empty_attribute(NAME_ATTRIBUTE) else {
                continue;
            };

            let threshold_ms =
                method_node.u64_attribute(THRESHOLD_ATTRIBUTE, rule.default_threshold_ms());
            let signature = method_node.attribute(SIGNATURE_ATTRIBUTE).unwrap_or_default();

            rule.add_method(method_name, signature, threshold_ms);
        }
    }
}
