#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tracehook_core::policy::AGENT_DOCUMENT_NAME;

/// A representative agent document exercising every block.
pub const FULL_DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ApplicationInsightsAgent>
  <Instrumentation>
    <BuiltIn enabled="true">
      <HTTP enabled="true" W3C="true" enableW3CBackCompat="false"/>
      <JDBC enabled="true"/>
      <Logging enabled="true" threshold="error"/>
      <Jedis enabled="false"/>
      <MaxStatementQueryLimitInMS>250</MaxStatementQueryLimitInMS>
    </BuiltIn>

    <Class name="com.foo.Bar" thresholdInMS="500">
      <Method name="doWork"/>
      <Method name="doOther" signature="(I)V" thresholdInMS="20"/>
      <Method name="skipped" enabled="false"/>
    </Class>

    <Class name="com.foo.Disabled" enabled="false">
      <Method name="neverTraced"/>
    </Class>

    <Class name="com.foo.Bar" type="HTTP" thresholdInMS="9000">
      <Method name="lateAddition"/>
    </Class>

    <Class name="com.foo.Repo" type="SQL">
      <Method name="find" signature=""/>
    </Class>
  </Instrumentation>
</ApplicationInsightsAgent>
"#;

/// Write `contents` as the agent document under `dir`.
pub fn write_document(dir: &Path, contents: &str) -> std::io::Result<()> {
    fs::write(dir.join(AGENT_DOCUMENT_NAME), contents)
}

/// Minimal enabled document tracing one method of one class.
pub fn single_class_document(class_name: &str, method: &str) -> String {
    format!(
        r#"<ApplicationInsightsAgent><Instrumentation>
             <Class name="{class_name}"><Method name="{method}"/></Class>
           </Instrumentation></ApplicationInsightsAgent>"#
    )
}
