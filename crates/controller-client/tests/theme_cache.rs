//! File-backed theme cache.

#![allow(clippy::unwrap_used)]

use controller_app::views::load_or_default;
use controller_app::{Theme, ThemeCache};
use controller_client::theme_cache::FileThemeCache;
use tempfile::tempdir;

#[test]
fn test_empty_cache_loads_nothing() {
    let dir = tempdir().unwrap();
    let cache = FileThemeCache::new(dir.path().join("nested"));
    assert_eq!(cache.load().unwrap(), None);
    assert_eq!(load_or_default(&cache), Theme::default());
}

#[test]
fn test_store_then_load() {
    let dir = tempdir().unwrap();
    let mut cache = FileThemeCache::new(dir.path().join("nested"));
    let theme = Theme::default().merged(&Theme::from_tokens([(
        "primary_color".to_string(),
        "#123456".to_string(),
    )]));

    cache.store(&theme).unwrap();
    assert!(cache.path().ends_with("recentTheme.json"));
    assert_eq!(cache.load().unwrap(), Some(theme));
}

#[test]
fn test_corrupt_entry_falls_back_to_default() {
    let dir = tempdir().unwrap();
    let cache = FileThemeCache::new(dir.path());
    std::fs::write(cache.path(), "{not json").unwrap();

    assert!(cache.load().is_err());
    assert_eq!(load_or_default(&cache), Theme::default());
}
