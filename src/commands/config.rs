use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::deploy::{DeployerConfig, LoaderLayout, SentinelWait};
use crate::http::HttpClient;
use crate::runtime::Runtime;

use super::paths::{default_root, discover_target_dir};

pub const DEFAULT_CATALOG_URL: &str = "https://thunderstore.io/api/v1/package/";

/// Values supplied on the command line or through `MODBAY_*` variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub game: Option<String>,
    pub catalog_url: Option<String>,
}

/// Every path and endpoint the core needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_root: PathBuf,
    pub profile_root: PathBuf,
    pub instance_root: PathBuf,
    pub download_root: PathBuf,
    pub catalog_cache_file: PathBuf,
    pub target_dir: Option<PathBuf>,
    pub catalog_url: String,
    pub layout: LoaderLayout,
    pub sentinel_wait: SentinelWait,
}

impl Config {
    /// All state below `root`.
    pub fn with_root(root: &Path) -> Self {
        Self {
            store_root: root.join("store"),
            profile_root: root.join("profiles"),
            instance_root: root.join("instances"),
            download_root: root.join("downloads"),
            catalog_cache_file: root.join("catalog.json"),
            target_dir: None,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            layout: LoaderLayout::default(),
            sentinel_wait: SentinelWait::default(),
        }
    }

    pub fn load<R: Runtime>(runtime: &R, overrides: ConfigOverrides) -> Result<Self> {
        let root = match overrides.root {
            Some(root) => root,
            None => default_root(runtime)?,
        };
        debug!("Using root {:?}", root);

        let mut config = Self::with_root(&root);
        if let Some(url) = overrides.catalog_url {
            config.catalog_url = url;
        }
        config.target_dir = match (overrides.target, overrides.game) {
            (Some(target), _) => Some(target),
            (None, Some(game)) => discover_target_dir(runtime, &game),
            (None, None) => None,
        };
        Ok(config)
    }

    pub fn target_dir(&self) -> Result<&Path> {
        self.target_dir
            .as_deref()
            .context("No target directory: pass --target (MODBAY_TARGET) or --game (MODBAY_GAME)")
    }

    pub fn deployer_config(&self) -> Result<DeployerConfig> {
        Ok(DeployerConfig {
            target_dir: self.target_dir()?.to_path_buf(),
            instance_root: self.instance_root.clone(),
            layout: self.layout.clone(),
            wait: self.sentinel_wait,
        })
    }

    /// The one HTTP client shared by catalog refreshes and downloads.
    pub fn http_client(&self) -> Result<HttpClient> {
        let client = Client::builder()
            .user_agent(format!("modbay/{}", env!("MODBAY_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpClient::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockito::{Matcher, Server};

    #[test]
    fn test_load_with_explicit_root_and_target() {
        let runtime = MockRuntime::new();
        let config = Config::load(
            &runtime,
            ConfigOverrides {
                root: Some(PathBuf::from("/data/modbay")),
                target: Some(PathBuf::from("/games/Valheim")),
                game: Some("Ignored".into()),
                catalog_url: Some("http://localhost/api/".into()),
            },
        )
        .unwrap();

        assert_eq!(config.store_root, PathBuf::from("/data/modbay/store"));
        assert_eq!(config.profile_root, PathBuf::from("/data/modbay/profiles"));
        assert_eq!(config.instance_root, PathBuf::from("/data/modbay/instances"));
        assert_eq!(config.download_root, PathBuf::from("/data/modbay/downloads"));
        assert_eq!(
            config.catalog_cache_file,
            PathBuf::from("/data/modbay/catalog.json")
        );
        assert_eq!(config.catalog_url, "http://localhost/api/");
        assert_eq!(config.target_dir().unwrap(), Path::new("/games/Valheim"));
    }

    #[test]
    fn test_load_defaults_to_data_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_data_dir()
            .returning(|| Some(PathBuf::from("/home/user/.local/share")));

        let config = Config::load(&runtime, ConfigOverrides::default()).unwrap();

        assert_eq!(
            config.store_root,
            PathBuf::from("/home/user/.local/share/modbay/store")
        );
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
        assert!(config.target_dir().is_err());
        assert!(config.deployer_config().is_err());
    }

    #[tokio::test]
    async fn test_http_client_sends_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", Matcher::Regex("^modbay/".into()))
            .create_async()
            .await;

        let config = Config::with_root(Path::new("/data"));
        let client = config.http_client().unwrap();
        client.fetch(&server.url()).await.unwrap();

        mock.assert_async().await;
    }
}
