//! Tests for the auth module

use super::*;

fn option(username: &str, password: &str, registry_token: &str) -> DockerOption {
    DockerOption {
        username: username.to_string(),
        password: password.to_string(),
        registry_token: registry_token.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_basic_wins_over_bearer() {
    let credential = resolve_credential(&option("user", "pass", "tok"));
    assert_eq!(
        credential,
        Credential::Basic {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    );
}

#[test]
fn test_bearer_when_no_basic_pair() {
    assert_eq!(
        resolve_credential(&option("", "", "tok")),
        Credential::Bearer("tok".to_string())
    );
    // A username alone is not a basic credential
    assert_eq!(
        resolve_credential(&option("user", "", "tok")),
        Credential::Bearer("tok".to_string())
    );
}

#[test]
fn test_keychain_when_nothing_set() {
    assert_eq!(resolve_credential(&option("", "", "")), Credential::Keychain);
    assert_eq!(resolve_credential(&option("", "pass", "")), Credential::Keychain);
}

#[test]
fn test_keychain_credential_uses_domain() {
    let keychain = StaticKeychain::new()
        .with_entry("ghcr.io", AuthConfig::new("user".into(), "pass".into()));

    assert_eq!(
        Credential::Keychain.into_registry_auth("ghcr.io", &keychain),
        RegistryAuth::Basic("user".into(), "pass".into())
    );
    assert_eq!(
        Credential::Keychain.into_registry_auth("docker.io", &keychain),
        RegistryAuth::Anonymous
    );
}

#[test]
fn test_explicit_credentials_skip_keychain() {
    struct FailingKeychain;
    impl Keychain for FailingKeychain {
        fn resolve(&self, _registry: &str) -> anyhow::Result<Box<dyn Authenticator>> {
            panic!("keychain must not be consulted");
        }
    }

    assert_eq!(
        Credential::Bearer("tok".into()).into_registry_auth("ghcr.io", &FailingKeychain),
        RegistryAuth::Bearer("tok".into())
    );
    assert_eq!(
        Credential::Basic {
            username: "u".into(),
            password: "p".into()
        }
        .into_registry_auth("ghcr.io", &FailingKeychain),
        RegistryAuth::Basic("u".into(), "p".into())
    );
}

#[test]
fn test_keychain_error_falls_back_to_anonymous() {
    struct BrokenKeychain;
    impl Keychain for BrokenKeychain {
        fn resolve(&self, _registry: &str) -> anyhow::Result<Box<dyn Authenticator>> {
            anyhow::bail!("store unavailable")
        }
    }

    assert_eq!(
        Credential::Keychain.into_registry_auth("ghcr.io", &BrokenKeychain),
        RegistryAuth::Anonymous
    );
}

#[test]
fn test_docker_config_parsing() {
    let config_json = r#"{
        "auths": {
            "docker.io": {
                "auth": "dXNlcjpwYXNz"
            },
            "gcr.io": {
                "username": "oauth2accesstoken",
                "password": "ya29.token",
                "registrytoken": "bearer-token"
            }
        },
        "credHelpers": {
            "ecr.amazonaws.com": "ecr-login"
        },
        "credsStore": "osxkeychain"
    }"#;

    let config: DockerConfig = serde_json::from_str(config_json).unwrap();

    assert_eq!(config.auths.len(), 2);
    assert_eq!(config.auths["docker.io"].auth, Some("dXNlcjpwYXNz".to_string()));
    assert_eq!(
        config.auths["gcr.io"].registry_token,
        Some("bearer-token".to_string())
    );
    assert_eq!(config.cred_helpers["ecr.amazonaws.com"], "ecr-login");
    assert_eq!(config.creds_store, Some("osxkeychain".to_string()));
}

#[test]
fn test_auth_config_to_registry_auth() {
    assert_eq!(AuthConfig::anonymous().to_registry_auth(), RegistryAuth::Anonymous);

    let encoded = AuthConfig {
        auth: Some("dXNlcjpwYXNz".to_string()),
        ..Default::default()
    };
    assert_eq!(
        encoded.to_registry_auth(),
        RegistryAuth::Basic("user".into(), "pass".into())
    );

    let token = AuthConfig {
        identity_token: Some("id-token".to_string()),
        ..Default::default()
    };
    assert_eq!(token.to_registry_auth(), RegistryAuth::Bearer("id-token".into()));
}
