use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(Path::new("/nonexistent/crm.toml"), no_env);
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.page_size, 10);
}

#[test]
fn file_values_are_overridden_by_env() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("crm_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let file = temp_root.join("crm.toml");
    fs::write(
        &file,
        "supabase_url = \"https://file.supabase.co\"\nanon_key = \"file-key\"\npage_size = 25\n",
    )
    .expect("write settings");

    let settings = load_settings_from(&file, |key| match key {
        "APP__SUPABASE_URL" => Some("https://env.supabase.co".to_string()),
        "SUPABASE_ACCESS_TOKEN" => Some("user-jwt".to_string()),
        _ => None,
    });

    assert_eq!(settings.supabase_url, "https://env.supabase.co");
    assert_eq!(settings.anon_key, "file-key");
    assert_eq!(settings.access_token.as_deref(), Some("user-jwt"));
    assert_eq!(settings.page_size, 25);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn unparsable_numbers_keep_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/crm.toml"), |key| match key {
        "APP__PAGE_SIZE" => Some("many".to_string()),
        "APP__REQUEST_TIMEOUT_SECS" => Some("-3".to_string()),
        _ => None,
    });
    assert_eq!(settings.page_size, 10);
    assert_eq!(settings.request_timeout_secs, 30);
}

#[test]
fn rest_base_url_appends_rest_path_once() {
    let mut settings = Settings {
        supabase_url: "https://project.supabase.co".into(),
        anon_key: "anon".into(),
        ..Settings::default()
    };
    assert_eq!(
        settings.rest_base_url().expect("url").as_str(),
        "https://project.supabase.co/rest/v1/"
    );

    settings.supabase_url = "http://127.0.0.1:54321/rest/v1".into();
    assert_eq!(
        settings.rest_base_url().expect("url").as_str(),
        "http://127.0.0.1:54321/rest/v1/"
    );
}

#[test]
fn rest_base_url_requires_url_and_key() {
    let settings = Settings {
        supabase_url: "https://project.supabase.co".into(),
        ..Settings::default()
    };
    let err = settings.rest_base_url().expect_err("missing key");
    assert!(err.to_string().contains("SUPABASE_ANON_KEY"));

    let settings = Settings {
        supabase_url: "ftp://project".into(),
        anon_key: "anon".into(),
        ..Settings::default()
    };
    assert!(settings.rest_base_url().is_err());
}
