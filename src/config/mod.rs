use crate::utils::error::{Result, RosterError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    pub gateway: GatewayConfig,
    pub owner: OwnerConfig,
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub students: StudentsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    /// 已登入使用者的 JWT；未設定時以 api_key 當作 bearer
    pub access_token: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerConfig {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentsConfig {
    /// 新增學生後是否依姓名重新排序（預設為附加在尾端）
    #[serde(default)]
    pub keep_sorted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
}

fn default_request_timeout() -> u64 {
    15
}

fn default_operation_timeout() -> u64 {
    30
}

impl RosterConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| RosterError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RosterError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ROSTER_API_KEY})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| RosterError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.stores.operation_timeout_secs)
    }
}

fn reject_unresolved(field: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(RosterError::MissingConfigError {
            field: format!("{} (environment variable not set)", field),
        });
    }
    Ok(())
}

impl Validate for RosterConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("gateway.base_url", &self.gateway.base_url)?;
        validation::validate_non_empty_string("gateway.api_key", &self.gateway.api_key)?;
        reject_unresolved("gateway.api_key", &self.gateway.api_key)?;
        if let Some(token) = &self.gateway.access_token {
            reject_unresolved("gateway.access_token", token)?;
        }
        validation::validate_positive_number(
            "gateway.request_timeout_secs",
            self.gateway.request_timeout_secs,
            1,
        )?;
        validation::validate_non_empty_string("owner.user_id", &self.owner.user_id)?;
        reject_unresolved("owner.user_id", &self.owner.user_id)?;
        validation::validate_positive_number(
            "stores.operation_timeout_secs",
            self.stores.operation_timeout_secs,
            1,
        )?;
        Ok(())
    }
}
