use std::sync::Arc;
use std::time::Duration;

use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::error::AppResult;
use crate::google::{FileStore, GoogleOAuth, SheetWriter, SpreadsheetSource};
use crate::model::layout::SheetLayout;
use crate::services::loader::{Dataset, load_dataset};
use crate::utils::load_cache::LoadCache;

/// Shared handles every handler works with.
pub struct AppState {
    pub sheets: Arc<dyn SpreadsheetSource>,
    pub writer: Arc<dyn SheetWriter>,
    pub files: Arc<dyn FileStore>,
    /// Present only in OAuth mode.
    pub oauth: Option<GoogleOAuth>,
    pub sessions: SessionStore,
    pub dataset: LoadCache<Dataset>,
    pub layout: SheetLayout,
}

impl AppState {
    pub fn new(
        config: &Config,
        sheets: Arc<dyn SpreadsheetSource>,
        writer: Arc<dyn SheetWriter>,
        files: Arc<dyn FileStore>,
        oauth: Option<GoogleOAuth>,
    ) -> Self {
        Self {
            sheets,
            writer,
            files,
            oauth,
            sessions: SessionStore::new(Duration::from_secs(config.session_ttl)),
            dataset: LoadCache::new(chrono::Duration::seconds(config.cache_ttl as i64)),
            layout: config.layout.clone(),
        }
    }

    /// Current roster and attendance, read through the load cache.
    pub async fn dataset(&self) -> AppResult<Arc<Dataset>> {
        self.dataset
            .get_or_load(|| load_dataset(self.sheets.as_ref(), &self.layout))
            .await
    }
}
