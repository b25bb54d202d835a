use jizhang_classify::{CachedCatalog, Classifier, ResponseFormatter};
use jizhang_core::{Bookkeeper, CatalogStore};

use crate::config::Config;

/// Everything a message needs, built once at startup and passed by reference.
pub struct AppContext<S> {
    pub config: Config,
    pub catalog: CachedCatalog<S>,
    pub classifier: Classifier,
    pub formatter: ResponseFormatter,
}

impl<S: CatalogStore + Bookkeeper> AppContext<S> {
    pub fn new(store: S, config: Config) -> Self {
        let classifier = Classifier::new(config.policy.clone());
        let formatter = ResponseFormatter::new(config.policy.utc_offset_hours);
        Self { catalog: CachedCatalog::new(store), classifier, formatter, config }
    }

    pub fn bookkeeper(&self) -> &S {
        self.catalog.inner()
    }
}
