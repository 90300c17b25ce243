//! Retriever configuration
//!
//! One immutable [`RetrieverConfig`] is built per run (defaults, then
//! `PROTDOM_*` environment variables, then caller overrides) and handed by
//! reference to every stage.

use protdom_common::{ProtDomError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_INTERPRO_API_URL: &str = "https://www.ebi.ac.uk/interpro/api";
pub const DEFAULT_UNIPROT_API_URL: &str = "https://rest.uniprot.org";
pub const DEFAULT_ALPHAFOLD_API_URL: &str = "https://alphafold.ebi.ac.uk/api";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound for the structure download pool
pub const MAX_CONCURRENT_DOWNLOADS: usize = 64;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Settings shared by every remote call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Attempts per remote call, including the first one
    pub max_retries: u32,

    /// Backoff unit; attempt `i` waits `2^i` units before retrying
    pub backoff_unit_ms: u64,

    /// Transport timeout applied to every single request
    pub request_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: format!("protdom-retriever/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// InterPro annotation lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    pub api_base_url: String,

    /// `page_size` query parameter for entry listings
    pub page_size: u32,

    /// Pause between accessions to respect the service rate limit
    pub request_delay_ms: u64,

    /// Skip accessions whose lookup fails instead of aborting the stage
    pub tolerate_partial: bool,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_INTERPRO_API_URL.to_string(),
            page_size: 200,
            request_delay_ms: 100,
            tolerate_partial: false,
        }
    }
}

/// UniProt ID-mapping job and result paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub api_base_url: String,

    /// Source namespace of the mapping job
    pub from_db: String,

    /// Target namespace of the mapping job
    pub to_db: String,

    pub poll_interval_ms: u64,

    /// Wall-clock limit for the job to reach a terminal state
    pub job_timeout_secs: u64,

    /// `size` query parameter for result pages
    pub results_page_size: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_UNIPROT_API_URL.to_string(),
            from_db: "UniProtKB_AC-ID".to_string(),
            to_db: "UniProtKB".to_string(),
            poll_interval_ms: 5000,
            job_timeout_secs: 300,
            results_page_size: 500,
        }
    }
}

impl SequenceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

/// AlphaFold structure download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    pub api_base_url: String,

    /// Directory under the output root receiving downloaded models
    pub structures_subdir: String,

    pub concurrent_downloads: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_ALPHAFOLD_API_URL.to_string(),
            structures_subdir: "alphafold_structures".to_string(),
            concurrent_downloads: 5,
        }
    }
}

/// Domain trimming
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrimConfig {
    /// Directory under the output root receiving trimmed domains
    pub output_subdir: String,

    /// Allow structures that do not follow the AlphaFold file naming
    pub accept_custom_structures: bool,

    /// Custom structures must carry the accession as a `_`-separated token
    pub custom_strict: bool,

    /// Directory of user-supplied structures, used instead of the download
    /// directory when custom structures are accepted
    pub structure_source_dir: Option<PathBuf>,
}

/// Complete configuration for one retrieval run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Root directory for every artifact of the run
    pub output_dir: PathBuf,
    pub http: HttpConfig,
    pub annotation: AnnotationConfig,
    pub sequence: SequenceConfig,
    pub structure: StructureConfig,
    pub trim: TrimConfig,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            http: HttpConfig::default(),
            annotation: AnnotationConfig::default(),
            sequence: SequenceConfig::default(),
            structure: StructureConfig::default(),
            trim: TrimConfig {
                output_subdir: "trimmed_structures".to_string(),
                ..TrimConfig::default()
            },
        }
    }
}

impl RetrieverConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - PROTDOM_OUTPUT_DIR
    /// - PROTDOM_MAX_RETRIES, PROTDOM_BACKOFF_UNIT_MS, PROTDOM_REQUEST_TIMEOUT_SECS
    /// - PROTDOM_INTERPRO_API_URL, PROTDOM_INTERPRO_PAGE_SIZE, PROTDOM_INTERPRO_DELAY_MS
    /// - PROTDOM_UNIPROT_API_URL, PROTDOM_UNIPROT_POLL_INTERVAL_MS,
    ///   PROTDOM_UNIPROT_JOB_TIMEOUT_SECS, PROTDOM_UNIPROT_PAGE_SIZE
    /// - PROTDOM_ALPHAFOLD_API_URL, PROTDOM_DOWNLOAD_CONCURRENCY
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            output_dir: env::var("PROTDOM_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            http: HttpConfig {
                max_retries: env_or("PROTDOM_MAX_RETRIES", defaults.http.max_retries),
                backoff_unit_ms: env_or("PROTDOM_BACKOFF_UNIT_MS", defaults.http.backoff_unit_ms),
                request_timeout_secs: env_or(
                    "PROTDOM_REQUEST_TIMEOUT_SECS",
                    defaults.http.request_timeout_secs,
                ),
                user_agent: defaults.http.user_agent,
            },
            annotation: AnnotationConfig {
                api_base_url: env_string(
                    "PROTDOM_INTERPRO_API_URL",
                    &defaults.annotation.api_base_url,
                ),
                page_size: env_or("PROTDOM_INTERPRO_PAGE_SIZE", defaults.annotation.page_size),
                request_delay_ms: env_or(
                    "PROTDOM_INTERPRO_DELAY_MS",
                    defaults.annotation.request_delay_ms,
                ),
                tolerate_partial: defaults.annotation.tolerate_partial,
            },
            sequence: SequenceConfig {
                api_base_url: env_string("PROTDOM_UNIPROT_API_URL", &defaults.sequence.api_base_url),
                poll_interval_ms: env_or(
                    "PROTDOM_UNIPROT_POLL_INTERVAL_MS",
                    defaults.sequence.poll_interval_ms,
                ),
                job_timeout_secs: env_or(
                    "PROTDOM_UNIPROT_JOB_TIMEOUT_SECS",
                    defaults.sequence.job_timeout_secs,
                ),
                results_page_size: env_or(
                    "PROTDOM_UNIPROT_PAGE_SIZE",
                    defaults.sequence.results_page_size,
                ),
                ..defaults.sequence
            },
            structure: StructureConfig {
                api_base_url: env_string(
                    "PROTDOM_ALPHAFOLD_API_URL",
                    &defaults.structure.api_base_url,
                ),
                concurrent_downloads: env_or(
                    "PROTDOM_DOWNLOAD_CONCURRENCY",
                    defaults.structure.concurrent_downloads,
                ),
                ..defaults.structure
            },
            trim: defaults.trim,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_tolerate_partial(mut self, tolerate: bool) -> Self {
        self.annotation.tolerate_partial = tolerate;
        self
    }

    /// Accept user-supplied structures, optionally from their own directory
    pub fn with_custom_structures(mut self, strict: bool, source_dir: Option<PathBuf>) -> Self {
        self.trim.accept_custom_structures = true;
        self.trim.custom_strict = strict;
        self.trim.structure_source_dir = source_dir;
        self
    }

    /// Directory receiving downloaded predicted structures
    pub fn structures_dir(&self) -> PathBuf {
        self.output_dir.join(&self.structure.structures_subdir)
    }

    /// Directory receiving trimmed domain structures
    pub fn trimmed_dir(&self) -> PathBuf {
        self.output_dir.join(&self.trim.output_subdir)
    }

    /// Path of an artifact directly under the output root
    pub fn artifact(&self, name: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(ProtDomError::validation("No output directory specified"));
        }

        if self.http.max_retries == 0 {
            return Err(ProtDomError::validation("max_retries must be at least 1"));
        }

        if self.http.request_timeout_secs == 0 {
            return Err(ProtDomError::validation("Request timeout must be greater than 0"));
        }

        for (name, url) in [
            ("InterPro", &self.annotation.api_base_url),
            ("UniProt", &self.sequence.api_base_url),
            ("AlphaFold", &self.structure.api_base_url),
        ] {
            if url.trim().is_empty() {
                return Err(ProtDomError::validation(format!("{} API URL cannot be empty", name)));
            }
        }

        if self.annotation.page_size == 0 || self.sequence.results_page_size == 0 {
            return Err(ProtDomError::validation("Page sizes must be greater than 0"));
        }

        if self.sequence.poll_interval_ms == 0 {
            return Err(ProtDomError::validation("Poll interval must be greater than 0"));
        }

        if self.sequence.job_timeout_secs == 0 {
            return Err(ProtDomError::validation("Job timeout must be greater than 0"));
        }

        if self.structure.concurrent_downloads == 0
            || self.structure.concurrent_downloads > MAX_CONCURRENT_DOWNLOADS
        {
            return Err(ProtDomError::validation(format!(
                "Concurrent downloads must be between 1 and {}",
                MAX_CONCURRENT_DOWNLOADS
            )));
        }

        if self.structure.structures_subdir.is_empty() || self.trim.output_subdir.is_empty() {
            return Err(ProtDomError::validation("Output subdirectory names cannot be empty"));
        }

        Ok(())
    }
}
