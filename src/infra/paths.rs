// src/infra/paths.rs — Path resolution
//
// All paths respect the SITERELAY_HOME environment variable for isolation.
// When SITERELAY_HOME is set, config and plugins live under it.
// When unset, both live under ~/.siterelay/.

use std::path::{Path, PathBuf};

/// Returns the SITERELAY_HOME override, if set.
fn siterelay_home() -> Option<PathBuf> {
    std::env::var_os("SITERELAY_HOME").map(PathBuf::from)
}

/// Home directory, falling back to the working directory when unknown.
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $SITERELAY_HOME/ or ~/.siterelay/
pub fn config_dir() -> PathBuf {
    if let Some(home) = siterelay_home() {
        return home;
    }
    dirs_home().join(".siterelay")
}

/// Default plugin directory: <config_dir>/plugins
pub fn plugins_dir() -> PathBuf {
    config_dir().join("plugins")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Render `path` relative to the working directory when possible.
///
/// Used to tag plugin log lines with a short location.
pub fn display_relative(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf));
    relative
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugins_dir_under_config_dir() {
        assert!(plugins_dir().starts_with(config_dir()));
        assert!(config_file_path().ends_with("config.toml"));
    }

    #[test]
    fn test_display_relative_strips_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let p = cwd.join("plugins").join("demo");
        let shown = display_relative(&p);
        assert_eq!(shown, Path::new("plugins").join("demo").display().to_string());
    }

    #[test]
    fn test_display_relative_keeps_foreign_path() {
        let p = Path::new("/definitely/not/under/cwd");
        assert_eq!(display_relative(p), p.display().to_string());
    }
}
