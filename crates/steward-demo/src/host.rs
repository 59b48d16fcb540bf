//! The demonstration host driven by the controller.

use serde::Deserialize;
use steward::{JsonTarget, Lifecycle};
use tracing::info;

const DEMO_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// Config file shape understood by the demonstration host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct DemoSettings {
    #[serde(rename = "Foo")]
    pub(crate) foo: String,
    #[serde(rename = "Baz")]
    pub(crate) baz: String,
}

/// Host that reports each lifecycle callback together with its live config.
pub(crate) struct DemoDaemon {
    settings: JsonTarget<DemoSettings>,
}

impl DemoDaemon {
    pub(crate) const fn new(settings: JsonTarget<DemoSettings>) -> Self {
        Self { settings }
    }
}

impl Lifecycle for DemoDaemon {
    fn start(&self) {
        let settings = self.settings.snapshot();
        info!(
            target: DEMO_TARGET,
            foo = %settings.foo,
            baz = %settings.baz,
            "demo daemon started"
        );
    }

    fn drain(&self) {
        info!(target: DEMO_TARGET, "demo daemon draining");
    }

    fn stop(&self) {
        info!(target: DEMO_TARGET, "demo daemon stopped");
    }

    fn on_new_config(&self) {
        let settings = self.settings.snapshot();
        info!(
            target: DEMO_TARGET,
            foo = %settings.foo,
            baz = %settings.baz,
            "demo config loaded"
        );
    }
}
