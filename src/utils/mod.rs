// src/utils/mod.rs — The `utils` bag handed to plugins with every request

pub mod image;
pub mod storage;
pub mod text;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::infra::errors::RelayError;
pub use text::LocaleTable;

/// Collaborators a plugin may use while handling a request.
///
/// Cheap to clone; the locale table and HTTP client are shared.
#[derive(Clone, Default)]
pub struct Utils {
    locale: Arc<LocaleTable>,
    http: reqwest::Client,
}

impl Utils {
    pub fn new(locale: LocaleTable) -> Self {
        Self {
            locale: Arc::new(locale),
            http: reqwest::Client::new(),
        }
    }

    pub fn sanitize(&self, s: &str) -> String {
        text::sanitize(s)
    }

    pub fn to_simplified(&self, s: &str) -> String {
        self.locale.convert(s)
    }

    pub async fn fetch_image(&self, url: &str) -> Option<Vec<u8>> {
        image::fetch_image(&self.http, url).await
    }

    pub async fn write_data(&self, dir: &Path, data: Value) -> Result<Value, RelayError> {
        storage::write_data(&self.http, dir, data).await
    }

    pub async fn write_data_url(&self, url: &str, dir: &Path) -> Option<PathBuf> {
        storage::write_data_url(&self.http, url, dir).await
    }
}
