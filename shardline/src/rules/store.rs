//! Rule publishing.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use shardline_config::Config;
use tracing::info;

use super::{AlgorithmRegistry, Error, RuleSet};

/// Holds the current [`RuleSet`].
///
/// Routing loads the `Arc` once per statement. Publishing swaps in
/// a new rule set; statements already routing keep the old one.
#[derive(Debug)]
pub struct RuleStore {
    current: ArcSwap<RuleSet>,
    lock: Mutex<()>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

impl RuleStore {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(rules),
            lock: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// Publish `rules` under the next version. Returns the version.
    pub fn publish(&self, rules: RuleSet) -> u64 {
        let _lock = self.lock.lock();
        let version = self.current.load().version() + 1;
        self.current.store(Arc::new(rules.with_version(version)));
        info!("rules version {} published", version);
        version
    }

    /// Compile `config` and publish it. On error, the current rules stay.
    pub fn reload(&self, config: &Config, registry: &AlgorithmRegistry) -> Result<u64, Error> {
        let rules = RuleSet::from_config(config, registry)?;
        Ok(self.publish(rules))
    }
}
