#[cfg(test)]
mod tests {
    use super::super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.docker, DockerOption::default());
        assert!(config.docker.platform.is_empty());
        assert!(!config.docker.insecure_skip_tls_verify);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
concurrency = 8

[docker]
platform = "*/arm64"
insecure_skip_tls_verify = true
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.docker.platform, "*/arm64");
        assert!(config.docker.insecure_skip_tls_verify);
        assert!(config.docker.username.is_empty());
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[docker]\nregistry_token = \"tok\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.docker.registry_token, "tok");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "concurrency = \"many\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
