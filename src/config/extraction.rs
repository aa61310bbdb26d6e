use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONVENIOS_ENDPOINT: &str =
    "https://api-dados-abertos.cearatransparente.ce.gov.br/transparencia/contratos/convenios";
pub const CONTRATOS_ENDPOINT: &str =
    "https://api-dados-abertos.cearatransparente.ce.gov.br/transparencia/contratos/contratos";

/// Everything one extraction run needs, passed explicitly to each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub date_range: DateRange,
    pub pagination: PaginationConfig,
    pub datasets: Vec<DatasetConfig>,
    pub fields: FieldClassification,
    pub output: OutputConfig,
}

/// Signing-date filter window, `DD/MM/YYYY` on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub max_pages: usize,
    /// Expected server page size; a shorter page is taken as the last one.
    pub page_size: usize,
    pub request_delay_ms: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub endpoint: String,
    pub csv_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldClassification {
    pub date_fields: Vec<String>,
    pub numeric_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub database_path: String,
    pub output_dir: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            date_range: DateRange::default(),
            pagination: PaginationConfig::default(),
            datasets: vec![
                DatasetConfig::new("convenios", CONVENIOS_ENDPOINT),
                DatasetConfig::new("contratos", CONTRATOS_ENDPOINT),
            ],
            fields: FieldClassification::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: "01/01/2024".to_string(),
            end: "31/12/2024".to_string(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            page_size: 15,
            request_delay_ms: 500,
            timeout_seconds: 30,
        }
    }
}

impl Default for FieldClassification {
    fn default() -> Self {
        Self {
            date_fields: ["data_assinatura", "data_processamento", "data_termino"]
                .map(String::from)
                .to_vec(),
            numeric_fields: [
                "valor_contrato",
                "valor_aditivo",
                "valor_empenhado",
                "valor_ajuste",
                "valor_pago",
                "valor_original_concedente",
                "valor_original_contrapartida",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "ceara_transparente.db".to_string(),
            output_dir: ".".to_string(),
        }
    }
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Query parameters understood by the API's signing-date filter.
    pub fn query_params(&self) -> Vec<(String, String)> {
        vec![
            ("data_assinatura_inicio".to_string(), self.start.clone()),
            ("data_assinatura_fim".to_string(), self.end.clone()),
        ]
    }
}

impl PaginationConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl DatasetConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            csv_file: None,
        }
    }

    /// File name of the delimited export, `<name>_ceara_transparente.csv` unless overridden.
    pub fn csv_file_name(&self) -> String {
        self.csv_file
            .clone()
            .unwrap_or_else(|| format!("{}_ceara_transparente.csv", self.name))
    }
}

impl FieldClassification {
    pub fn is_date_field(&self, column: &str) -> bool {
        self.date_fields.iter().any(|f| f == column)
    }

    pub fn is_numeric_field(&self, column: &str) -> bool {
        self.numeric_fields.iter().any(|f| f == column)
    }
}

impl ExtractionConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，缺少的欄位使用預設值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn csv_path(&self, dataset: &DatasetConfig) -> PathBuf {
        Path::new(&self.output.output_dir).join(dataset.csv_file_name())
    }

    pub fn validate_config(&self) -> Result<()> {
        let start = validation::validate_filter_date("date_range.start", &self.date_range.start)?;
        let end = validation::validate_filter_date("date_range.end", &self.date_range.end)?;
        if start > end {
            return Err(EtlError::InvalidConfigValueError {
                field: "date_range".to_string(),
                value: format!("{} - {}", self.date_range.start, self.date_range.end),
                reason: "Start date is after end date".to_string(),
            });
        }

        validation::validate_positive_number(
            "pagination.page_size",
            self.pagination.page_size as u64,
            1,
        )?;
        validation::validate_positive_number(
            "pagination.timeout_seconds",
            self.pagination.timeout_seconds,
            1,
        )?;

        if self.datasets.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "datasets".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut csv_files = HashSet::new();
        for dataset in &self.datasets {
            validation::validate_identifier("datasets.name", &dataset.name)?;
            validation::validate_url("datasets.endpoint", &dataset.endpoint)?;
            if let Some(file) = &dataset.csv_file {
                validation::validate_path("datasets.csv_file", file)?;
            }
            if !seen.insert(dataset.name.as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "datasets.name".to_string(),
                    value: dataset.name.clone(),
                    reason: "Dataset names must be unique".to_string(),
                });
            }
            let csv_file = dataset.csv_file_name();
            if !csv_files.insert(csv_file.clone()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "datasets.csv_file".to_string(),
                    value: csv_file,
                    reason: "Two datasets would write the same CSV file".to_string(),
                });
            }
        }

        validation::validate_path("output.database_path", &self.output.database_path)?;
        validation::validate_path("output.output_dir", &self.output.output_dir)?;

        Ok(())
    }
}

impl Validate for ExtractionConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_published_endpoints() {
        let config = ExtractionConfig::default();

        assert_eq!(config.date_range, DateRange::new("01/01/2024", "31/12/2024"));
        assert_eq!(config.pagination.max_pages, 5);
        assert_eq!(config.pagination.page_size, 15);
        assert_eq!(config.pagination.request_delay(), Duration::from_millis(500));
        assert_eq!(config.pagination.timeout(), Duration::from_secs(30));
        assert_eq!(config.datasets[0].name, "convenios");
        assert_eq!(config.datasets[1].name, "contratos");
        assert_eq!(
            config.datasets[0].csv_file_name(),
            "convenios_ceara_transparente.csv"
        );
        assert!(config.fields.is_date_field("data_assinatura"));
        assert!(config.fields.is_numeric_field("valor_pago"));
        assert!(!config.fields.is_numeric_field("orgao"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_date_range_query_params() {
        let params = DateRange::default().query_params();
        assert_eq!(
            params,
            vec![
                ("data_assinatura_inicio".to_string(), "01/01/2024".to_string()),
                ("data_assinatura_fim".to_string(), "31/12/2024".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let toml_content = r#"
[date_range]
start = "01/06/2023"
end = "30/06/2023"

[pagination]
max_pages = 2

[output]
output_dir = "./exports"
"#;

        let config = ExtractionConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.date_range.start, "01/06/2023");
        assert_eq!(config.pagination.max_pages, 2);
        assert_eq!(config.pagination.page_size, 15);
        assert_eq!(config.output.output_dir, "./exports");
        assert_eq!(config.output.database_path, "ceara_transparente.db");
        assert_eq!(config.datasets.len(), 2);
    }

    #[test]
    fn test_parse_custom_datasets() {
        let toml_content = r#"
[[datasets]]
name = "contratos"
endpoint = "https://example.com/contratos"
csv_file = "contratos.csv"
"#;

        let config = ExtractionConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.datasets.len(), 1);
        let dataset = config.dataset("contratos").unwrap();
        assert_eq!(dataset.csv_file_name(), "contratos.csv");
        assert!(config.dataset("convenios").is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TRANSPARENCIA_TEST_OUTPUT_DIR", "/tmp/transparencia");

        let toml_content = r#"
[output]
output_dir = "${TRANSPARENCIA_TEST_OUTPUT_DIR}"
database_path = "${TRANSPARENCIA_TEST_UNSET_VAR}"
"#;

        let config = ExtractionConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.output.output_dir, "/tmp/transparencia");
        assert_eq!(config.output.database_path, "${TRANSPARENCIA_TEST_UNSET_VAR}");

        std::env::remove_var("TRANSPARENCIA_TEST_OUTPUT_DIR");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ExtractionConfig::from_toml_str("[pagination\nmax_pages = 1").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ExtractionConfig::default();
        config.date_range = DateRange::new("31/12/2024", "01/01/2024");
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::default();
        config.date_range = DateRange::new("2024-01-01", "31/12/2024");
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::default();
        config.pagination.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::default();
        config.datasets[1].name = "convenios".to_string();
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::default();
        config.datasets[0].endpoint = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::default();
        config.datasets.clear();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_datasets_sharing_a_csv_file_are_rejected() {
        let mut config = ExtractionConfig::default();
        config.datasets[1].csv_file = Some("convenios_ceara_transparente.csv".to_string());

        match config.validate() {
            Err(EtlError::InvalidConfigValueError { field, value, .. }) => {
                assert_eq!(field, "datasets.csv_file");
                assert_eq!(value, "convenios_ceara_transparente.csv");
            }
            other => panic!("unexpected validation result {:?}", other),
        }
    }

    #[test]
    fn test_zero_max_pages_is_valid() {
        let mut config = ExtractionConfig::default();
        config.pagination.max_pages = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[pagination]\npage_size = 50\nrequest_delay_ms = 0\n")
            .unwrap();

        let config = ExtractionConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pagination.page_size, 50);
        assert_eq!(config.pagination.request_delay(), Duration::ZERO);
    }
}
