use prompt_library::Config;
use prompt_library::config::RuntimeConfig;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_file_then_env_overrides() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("prompt_library.toml");
    std::fs::write(
        &config_path,
        r#"
[paths]
prompts_csv = "from_file.csv"
influences_csv = "influences_from_file.csv"

[generation]
default_count = 8
"#,
    )
    .unwrap();

    unsafe {
        std::env::set_var("PROMPT_LIBRARY_CONFIG", &config_path);
        std::env::set_var("PL_PROMPTS_CSV", "/data/override.csv");
    }

    let config = Config::load().unwrap();
    assert_eq!(config.paths.prompts_csv, PathBuf::from("/data/override.csv"));
    assert_eq!(
        config.paths.influences_csv,
        PathBuf::from("influences_from_file.csv")
    );
    assert_eq!(config.generation.default_count, 8);
    assert_eq!(config.generation.clone_ratio, 0.5);

    std::fs::write(&config_path, "[generation]\nclone_ratio = 1.5\n").unwrap();
    assert!(Config::load().is_err());

    // The log level must be readable before Config::load runs.
    let env_file = dir.path().join("library.env");
    std::fs::write(&env_file, "RUST_LOG=prompt_library=debug\n").unwrap();
    unsafe {
        std::env::remove_var("RUST_LOG");
        std::env::set_var("PROMPT_LIBRARY_ENV_FILE", &env_file);
    }
    Config::load_env_file();
    assert_eq!(RuntimeConfig::load_from_env().log_level, "prompt_library=debug");

    unsafe {
        std::env::remove_var("PROMPT_LIBRARY_CONFIG");
        std::env::remove_var("PL_PROMPTS_CSV");
        std::env::remove_var("PROMPT_LIBRARY_ENV_FILE");
        std::env::remove_var("RUST_LOG");
    }
}
