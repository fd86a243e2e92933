//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Browser automation endpoint and session settings
    #[serde(default)]
    pub surface: SurfaceConfig,

    /// Target site: login form and table page
    #[serde(default)]
    pub site: SiteConfig,

    /// Scroll loop pacing and termination limits
    #[serde(default)]
    pub scroll: ScrollConfig,

    /// Selectors used to locate rows in the rendered page
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Durable store locations
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.surface.webdriver_url)?;
        url::Url::parse(&self.site.login_url)?;
        url::Url::parse(&self.site.target_url)?;

        if self.surface.page_timeout_secs == 0 {
            return Err(AppError::validation("surface.page_timeout_secs must be > 0"));
        }
        if self.surface.element_timeout_secs == 0 {
            return Err(AppError::validation(
                "surface.element_timeout_secs must be > 0",
            ));
        }
        if self.scroll.step == 0 {
            return Err(AppError::validation("scroll.step must be > 0"));
        }
        if self.scroll.batch_size == 0 {
            return Err(AppError::validation("scroll.batch_size must be > 0"));
        }
        if self.scroll.max_stall_attempts == 0 {
            return Err(AppError::validation(
                "scroll.max_stall_attempts must be > 0",
            ));
        }
        if self.extraction.min_cells == 0 {
            return Err(AppError::validation("extraction.min_cells must be > 0"));
        }

        for (name, selector) in [
            ("site.email_selector", &self.site.email_selector),
            ("site.password_selector", &self.site.password_selector),
            ("site.submit_selector", &self.site.submit_selector),
            ("extraction.scroll_region", &self.extraction.scroll_region),
            ("extraction.table_region", &self.extraction.table_region),
            ("extraction.row_selector", &self.extraction.row_selector),
            ("extraction.cell_selector", &self.extraction.cell_selector),
            ("extraction.text_selector", &self.extraction.text_selector),
        ] {
            if selector.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector.as_str(), format!("{e:?}")))?;
        }

        Ok(())
    }
}

/// WebDriver session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Base URL of the WebDriver server (chromedriver, geckodriver)
    #[serde(default = "defaults::webdriver_url")]
    pub webdriver_url: String,

    /// Browser name requested in the session capabilities
    #[serde(default = "defaults::browser")]
    pub browser: String,

    #[serde(default = "defaults::headless")]
    pub headless: bool,

    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::window_width")]
    pub window_width: u32,

    #[serde(default = "defaults::window_height")]
    pub window_height: u32,

    /// Page load timeout in seconds
    #[serde(default = "defaults::page_timeout")]
    pub page_timeout_secs: u64,

    /// Upper bound for element readiness waits in seconds
    #[serde(default = "defaults::element_timeout")]
    pub element_timeout_secs: u64,
}

impl SurfaceConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            webdriver_url: defaults::webdriver_url(),
            browser: defaults::browser(),
            headless: defaults::headless(),
            user_agent: defaults::user_agent(),
            window_width: defaults::window_width(),
            window_height: defaults::window_height(),
            page_timeout_secs: defaults::page_timeout(),
            element_timeout_secs: defaults::element_timeout(),
        }
    }
}

/// Login form and target page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "defaults::login_url")]
    pub login_url: String,

    /// Page hosting the infinite-scroll table
    #[serde(default = "defaults::target_url")]
    pub target_url: String,

    #[serde(default = "defaults::email_selector")]
    pub email_selector: String,

    #[serde(default = "defaults::password_selector")]
    pub password_selector: String,

    #[serde(default = "defaults::submit_selector")]
    pub submit_selector: String,

    /// Fixed wait after submitting the login form, in seconds.
    ///
    /// The landing page after login is not known in advance, so there is no
    /// element to wait for.
    #[serde(default = "defaults::post_login_wait")]
    pub post_login_wait_secs: u64,

    /// Upper bound for the table region to appear on the target page, in seconds
    #[serde(default = "defaults::post_navigation_wait")]
    pub post_navigation_wait_secs: u64,

    /// Elements removed from the DOM before harvesting
    #[serde(default = "defaults::prune_selectors")]
    pub prune_selectors: Vec<String>,
}

impl SiteConfig {
    pub fn post_login_wait(&self) -> Duration {
        Duration::from_secs(self.post_login_wait_secs)
    }

    pub fn post_navigation_wait(&self) -> Duration {
        Duration::from_secs(self.post_navigation_wait_secs)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: defaults::login_url(),
            target_url: defaults::target_url(),
            email_selector: defaults::email_selector(),
            password_selector: defaults::password_selector(),
            submit_selector: defaults::submit_selector(),
            post_login_wait_secs: defaults::post_login_wait(),
            post_navigation_wait_secs: defaults::post_navigation_wait(),
            prune_selectors: defaults::prune_selectors(),
        }
    }
}

/// Scroll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Pixels advanced per iteration
    #[serde(default = "defaults::step")]
    pub step: u64,

    /// Wait after each scroll for rows to materialize, in milliseconds.
    ///
    /// The page exposes no signal for "new rows rendered", so this stays a
    /// fixed delay.
    #[serde(default = "defaults::settle_delay")]
    pub settle_delay_ms: u64,

    /// Pause between iterations, in milliseconds
    #[serde(default = "defaults::step_pause")]
    pub step_pause_ms: u64,

    /// Hard cap on the scroll position regardless of page height
    #[serde(default = "defaults::max_position")]
    pub max_position: u64,

    /// Consecutive iterations without a new row before giving up
    #[serde(default = "defaults::max_stall_attempts")]
    pub max_stall_attempts: u32,

    /// Fragments buffered before a flush
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,
}

impl ScrollConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step: defaults::step(),
            settle_delay_ms: defaults::settle_delay(),
            step_pause_ms: defaults::step_pause(),
            max_position: defaults::max_position(),
            max_stall_attempts: defaults::max_stall_attempts(),
            batch_size: defaults::batch_size(),
        }
    }
}

/// CSS selectors for the table being harvested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Scrollable sub-region; whole-document scrolling is used when absent
    #[serde(default = "defaults::scroll_region")]
    pub scroll_region: String,

    /// Region holding the table rows
    #[serde(default = "defaults::table_region")]
    pub table_region: String,

    /// Row elements; each must carry an `id` attribute
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    #[serde(default = "defaults::cell_selector")]
    pub cell_selector: String,

    /// Inner element holding the display text of name and price cells
    #[serde(default = "defaults::text_selector")]
    pub text_selector: String,

    /// Rows with fewer cells are skipped by the transformer
    #[serde(default = "defaults::min_cells")]
    pub min_cells: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scroll_region: defaults::scroll_region(),
            table_region: defaults::table_region(),
            row_selector: defaults::row_selector(),
            cell_selector: defaults::cell_selector(),
            text_selector: defaults::text_selector(),
            min_cells: defaults::min_cells(),
        }
    }
}

/// Durable store file names, relative to `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "defaults::checkpoint_file")]
    pub checkpoint_file: String,

    #[serde(default = "defaults::batch_file")]
    pub batch_file: String,

    #[serde(default = "defaults::master_file")]
    pub master_file: String,

    #[serde(default = "defaults::final_file")]
    pub final_file: String,

    #[serde(default = "defaults::job_file")]
    pub job_file: String,

    /// Also write the final dataset as CSV next to the JSON file
    #[serde(default = "defaults::export_csv")]
    pub export_csv: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            checkpoint_file: defaults::checkpoint_file(),
            batch_file: defaults::batch_file(),
            master_file: defaults::master_file(),
            final_file: defaults::final_file(),
            job_file: defaults::job_file(),
            export_csv: defaults::export_csv(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Surface defaults
    pub fn webdriver_url() -> String {
        "http://localhost:9515".into()
    }
    pub fn browser() -> String {
        "chrome".into()
    }
    pub fn headless() -> bool {
        true
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.7049.52 Safari/537.36".into()
    }
    pub fn window_width() -> u32 {
        1920
    }
    pub fn window_height() -> u32 {
        1080
    }
    pub fn page_timeout() -> u64 {
        60
    }
    pub fn element_timeout() -> u64 {
        10
    }

    // Site defaults
    pub fn login_url() -> String {
        "https://lk.eutd.ru/login".into()
    }
    pub fn target_url() -> String {
        "https://lk.eutd.ru/nomenclatures".into()
    }
    pub fn email_selector() -> String {
        r#"input[name="email"]"#.into()
    }
    pub fn password_selector() -> String {
        r#"input[name="password"]"#.into()
    }
    pub fn submit_selector() -> String {
        r#"button[type="submit"]"#.into()
    }
    pub fn post_login_wait() -> u64 {
        10
    }
    pub fn post_navigation_wait() -> u64 {
        20
    }
    pub fn prune_selectors() -> Vec<String> {
        vec![".folder_container".into()]
    }

    // Scroll defaults
    pub fn step() -> u64 {
        800
    }
    pub fn settle_delay() -> u64 {
        2000
    }
    pub fn step_pause() -> u64 {
        500
    }
    pub fn max_position() -> u64 {
        725_000
    }
    pub fn max_stall_attempts() -> u32 {
        10_000
    }
    pub fn batch_size() -> usize {
        50
    }

    // Extraction defaults
    pub fn scroll_region() -> String {
        ".main_content_container".into()
    }
    pub fn table_region() -> String {
        "div.table_container".into()
    }
    pub fn row_selector() -> String {
        "tr[id]".into()
    }
    pub fn cell_selector() -> String {
        "td".into()
    }
    pub fn text_selector() -> String {
        "div.row_width_copy span".into()
    }
    pub fn min_cells() -> usize {
        8
    }

    // Path defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn checkpoint_file() -> String {
        "last_position.txt".into()
    }
    pub fn batch_file() -> String {
        "batches.json".into()
    }
    pub fn master_file() -> String {
        "master.json".into()
    }
    pub fn final_file() -> String {
        "result.json".into()
    }
    pub fn job_file() -> String {
        "job.json".into()
    }
    pub fn export_csv() -> bool {
        true
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
