use crate::core::clustering::ClusterParams;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_RANKING_ENDPOINT: &str = "https://ranking.glassdollar.com/graphql";
pub const DEFAULT_PARTNER_ENDPOINT: &str = "https://glassdollar-api.com/graphql";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ranking: RankingApiConfig,
    pub partners: PartnerApiConfig,
    pub clustering: ClusteringConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingApiConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// 最多抓取幾頁；未設定則抓到空頁為止
    pub max_pages: Option<u32>,
}

impl Default for RankingApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RANKING_ENDPOINT.to_string(),
            user_agent: concat!("corp-fetch/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 10,
            max_pages: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerApiConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for PartnerApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PARTNER_ENDPOINT.to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub clusters: usize,
    pub max_iterations: usize,
    pub n_init: usize,
    pub seed: u64,
    pub tolerance: f64,
    pub output_file: String,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let params = ClusterParams::default();
        Self {
            clusters: params.n_clusters,
            max_iterations: params.max_iterations,
            n_init: params.n_init,
            seed: params.seed,
            tolerance: params.tolerance,
            output_file: "clustered_companies.json".to_string(),
        }
    }
}

impl ClusteringConfig {
    pub fn params(&self) -> ClusterParams {
        ClusterParams {
            n_clusters: self.clusters,
            max_iterations: self.max_iterations,
            n_init: self.n_init,
            seed: self.seed,
            tolerance: self.tolerance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: ".".to_string(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RANKING_ENDPOINT})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn ranking_timeout(&self) -> Duration {
        Duration::from_secs(self.ranking.timeout_seconds)
    }

    pub fn partner_timeout(&self) -> Duration {
        Duration::from_secs(self.partners.timeout_seconds)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_bind_address("server.bind", &self.server.bind)?;

        validation::validate_graphql_endpoint("ranking.endpoint", &self.ranking.endpoint)?;
        validation::validate_user_agent("ranking.user_agent", &self.ranking.user_agent)?;
        validation::validate_timeout_seconds("ranking.timeout_seconds", self.ranking.timeout_seconds)?;
        if let Some(max_pages) = self.ranking.max_pages {
            validation::validate_at_least_one("ranking.max_pages", max_pages as usize)?;
        }

        validation::validate_graphql_endpoint("partners.endpoint", &self.partners.endpoint)?;
        validation::validate_timeout_seconds("partners.timeout_seconds", self.partners.timeout_seconds)?;

        validation::validate_at_least_one("clustering.clusters", self.clustering.clusters)?;
        validation::validate_at_least_one("clustering.max_iterations", self.clustering.max_iterations)?;
        validation::validate_at_least_one("clustering.n_init", self.clustering.n_init)?;
        validation::validate_tolerance("clustering.tolerance", self.clustering.tolerance)?;
        validation::validate_output_file("clustering.output_file", &self.clustering.output_file)?;

        validation::validate_output_dir("output.path", &self.output.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ranking.endpoint, DEFAULT_RANKING_ENDPOINT);
        assert_eq!(config.clustering.clusters, 4);
        assert_eq!(config.clustering.output_file, "clustered_companies.json");
        assert_eq!(config.ranking_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
bind = "127.0.0.1:9000"

[ranking]
endpoint = "https://ranking.example.com/graphql"
max_pages = 3

[clustering]
clusters = 6
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.ranking.endpoint, "https://ranking.example.com/graphql");
        assert_eq!(config.ranking.max_pages, Some(3));
        assert_eq!(config.ranking.timeout_seconds, 10);
        assert_eq!(config.partners.endpoint, DEFAULT_PARTNER_ENDPOINT);
        assert_eq!(config.clustering.clusters, 6);
        assert_eq!(config.clustering.n_init, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CORP_FETCH_TEST_PARTNER_ENDPOINT", "https://partners.test/graphql");

        let toml_content = r#"
[partners]
endpoint = "${CORP_FETCH_TEST_PARTNER_ENDPOINT}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.partners.endpoint, "https://partners.test/graphql");

        std::env::remove_var("CORP_FETCH_TEST_PARTNER_ENDPOINT");
    }

    #[test]
    fn test_unset_env_var_is_left_alone() {
        let toml_content = r#"
[ranking]
endpoint = "${CORP_FETCH_TEST_SURELY_UNSET}"
"#;
        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.ranking.endpoint, "${CORP_FETCH_TEST_SURELY_UNSET}");
        match config.validate() {
            Err(AppError::MissingConfigError { field }) => assert_eq!(field, "ranking.endpoint"),
            other => panic!("expected missing ranking.endpoint, got {:?}", other),
        }
    }

    #[test]
    fn test_report_file_must_stay_under_output_path() {
        let mut config = AppConfig::default();
        config.clustering.output_file = "/etc/clusters.json".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfigValueError { field, .. }) if field == "clustering.output_file"
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.clustering.clusters = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.bind = "nowhere".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.ranking.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml_str("[server\nbind = 1").unwrap_err();
        assert!(matches!(err, AppError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[output]
path = "./out"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.path, "./out");
    }
}
