// src/utils/storage.rs — JSON-array persistence with image extraction
//
// Layout of a data directory:
//   <dir>/data.json   JSON array, one entry per write
//   <dir>/images/     images extracted from written items

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::image::{decode_data_url, fetch_image, is_remote};
use crate::infra::errors::RelayError;

const DATA_FILE: &str = "data.json";
const IMAGES_DIR: &str = "images";

/// File name for a newly saved image: `<YYYYMMDDHHMMSS>_<uuid>.<ext>`.
fn image_file_name(ext: &str) -> String {
    let date_prefix = chrono::Utc::now().format("%Y%m%d%H%M%S");
    format!("{}_{}.{}", date_prefix, uuid::Uuid::new_v4(), ext)
}

/// Save one image, given as an http(s) URL or a base64 `data:image/...` URL,
/// into `dir`. Returns the saved path, or `None` when the image is unusable.
pub async fn write_data_url(client: &reqwest::Client, url: &str, dir: &Path) -> Option<PathBuf> {
    let (ext, bytes) = if is_remote(url) {
        match fetch_image(client, url).await {
            Some(bytes) => ("png".to_string(), bytes),
            None => {
                tracing::warn!("Invalid image url: {}", url);
                return None;
            }
        }
    } else {
        decode_data_url(url)?
    };

    let path = dir.join(image_file_name(&ext));
    match tokio::fs::write(&path, &bytes).await {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!("Failed to write image {}: {}", path.display(), e);
            None
        }
    }
}

/// Read the existing entries of `data.json`.
///
/// A missing or blank file is an empty array; anything else that is not a
/// JSON array is refused so a foreign file is never overwritten.
async fn read_entries(path: &Path) -> Result<Vec<Value>, RelayError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = tokio::fs::read_to_string(path).await?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => Ok(entries),
        Ok(_) => Err(RelayError::Other(anyhow::anyhow!(
            "{} is not a JSON array",
            path.display()
        ))),
        Err(e) => Err(RelayError::Other(anyhow::anyhow!(
            "{} is not valid JSON: {}",
            path.display(),
            e
        ))),
    }
}

fn has_image_items(data: &Value) -> bool {
    data.as_array().is_some_and(|items| {
        items
            .iter()
            .any(|item| item.as_object().is_some_and(|o| o.contains_key("images")))
    })
}

/// Replace every item's `images` with the paths of the images actually saved.
async fn extract_images(client: &reqwest::Client, items: &[Value], images_dir: &Path) -> Value {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(images) = item.get("images").and_then(Value::as_array) else {
            out.push(item.clone());
            continue;
        };

        let mut saved = Vec::new();
        for image in images.iter().filter_map(Value::as_str) {
            if let Some(path) = write_data_url(client, image, images_dir).await {
                saved.push(Value::String(path.display().to_string()));
            }
        }

        let mut item = item.clone();
        if let Some(obj) = item.as_object_mut() {
            obj.insert("images".into(), Value::Array(saved));
        }
        out.push(item);
    }
    Value::Array(out)
}

/// Append `data` to `<dir>/data.json` and return the appended entry.
pub async fn write_data(
    client: &reqwest::Client,
    dir: &Path,
    data: Value,
) -> Result<Value, RelayError> {
    let images_dir = dir.join(IMAGES_DIR);
    tokio::fs::create_dir_all(&images_dir).await?;

    let data_path = dir.join(DATA_FILE);
    let mut entries = read_entries(&data_path).await?;

    let entry = if has_image_items(&data) {
        let items = data.as_array().map(Vec::as_slice).unwrap_or_default();
        extract_images(client, items, &images_dir).await
    } else {
        data
    };

    entries.push(entry.clone());
    let json = serde_json::to_string_pretty(&entries).map_err(anyhow::Error::from)?;
    tokio::fs::write(&data_path, json).await?;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_file_name_shape() {
        let name = image_file_name("jpeg");
        let (prefix, rest) = name.split_once('_').unwrap();
        assert_eq!(prefix.len(), 14);
        assert!(prefix.chars().all(|c| c.is_ascii_digit()));
        assert!(rest.ends_with(".jpeg"));
    }

    #[tokio::test]
    async fn test_write_data_appends() {
        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();

        write_data(&client, dir.path(), json!({"a": 1})).await.unwrap();
        write_data(&client, dir.path(), json!({"a": 2})).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(DATA_FILE)).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, json!([{"a": 1}, {"a": 2}]));
        assert!(dir.path().join(IMAGES_DIR).is_dir());
    }

    #[tokio::test]
    async fn test_write_data_refuses_non_array_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DATA_FILE), r#"{"not": "array"}"#).unwrap();
        let client = reqwest::Client::new();

        let result = write_data(&client, dir.path(), json!(1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_write_data_blank_file_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DATA_FILE), "  \n").unwrap();
        let client = reqwest::Client::new();

        let entry = write_data(&client, dir.path(), json!("x")).await.unwrap();
        assert_eq!(entry, json!("x"));
    }

    #[tokio::test]
    async fn test_write_data_extracts_inline_images() {
        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let data = json!([
            {"label": "cover", "value": "v", "images": ["data:image/png;base64,aGVsbG8=", "data:bogus"]},
            {"label": "title", "value": "t"}
        ]);

        let entry = write_data(&client, dir.path(), data).await.unwrap();
        let images = entry[0]["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        let saved = PathBuf::from(images[0].as_str().unwrap());
        assert!(saved.starts_with(dir.path().join(IMAGES_DIR)));
        assert_eq!(std::fs::read(&saved).unwrap(), b"hello");
        assert_eq!(entry[1], json!({"label": "title", "value": "t"}));
    }
}
