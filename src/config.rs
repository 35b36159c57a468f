use std::path::{Path, PathBuf};

use crossterm::style::Stylize;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Uncased, UncasedStr, Value},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{backend::BackendSettings, default_colors::*};

pub const ENV_PREFIX: &str = "BOOKDROP_";
pub const CONFIG_PATH_VAR: &str = "BOOKDROP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/bookdrop/config.toml";

/// Value of `order` that turns ordering off.
pub const ORDER_NONE: &str = "none";

/// Keys accepted by `config set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "backend_url",
    "project_ref",
    "api_key",
    "bot_username",
    "link_base",
    "link_prefix",
    "table",
    "order",
    "count_total",
    "listen",
    "default_limit",
    "max_limit",
    "proxy_url",
    "page_size",
    "debounce_ms",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] figment::Error),
    #[error("Couldn't access the config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Couldn't write the config file: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Couldn't parse the config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Missing configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("Unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("Expected KEY=VALUE, got `{0}`")]
    InvalidPair(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    bold:   bool,
    italic: bool,
    color:  crossterm::style::Color,
}

impl StyleConfig {
    fn style(&self, s: impl ToString) -> String {
        let mut s = s.to_string().with(self.color);
        if self.bold {
            s = s.bold();
        }
        if self.italic {
            s = s.italic();
        }
        s.to_string()
    }
}

pub trait Styleable {
    fn style(&self, c: &StyleConfig) -> String;
}

impl<T> Styleable for T
where
    T: ToString + std::fmt::Display,
{
    fn style(&self, c: &StyleConfig) -> String {
        c.style(self)
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            color:  COLOR_WHITE,
            bold:   false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub prefix:            String,
    pub suffix:            String,
    pub description:       String,
    pub style_description: StyleConfig,
    pub style_content:     StyleConfig,
}

impl OutputConfig {
    pub fn format_str(&self, content: impl ToString) -> String {
        let description = if self.description.is_empty() {
            String::new()
        } else {
            format!("{} ", self.description.style(&self.style_description))
        };
        let content = content.to_string().style(&self.style_content);
        format!("{}{description}{content}{}", self.prefix, self.suffix)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix:            "".into(),
            suffix:            "".into(),
            description:       "".into(),
            style_description: StyleConfig {
                italic: true,
                color: COLOR_DIMMED,
                ..StyleConfig::default()
            },
            style_content:     StyleConfig::default(),
        }
    }
}

/// How cards and notices look in the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub output_index:   OutputConfig,
    pub output_title:   OutputConfig,
    pub output_size:    OutputConfig,
    pub output_format:  OutputConfig,
    pub output_caption: OutputConfig,
    pub output_link:    OutputConfig,
    pub output_status:  OutputConfig,
    pub output_notice:  OutputConfig,
    pub output_error:   OutputConfig,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            output_index:   OutputConfig {
                prefix: "[".into(),
                suffix: "]".into(),
                style_content: StyleConfig {
                    color: COLOR_DIMMED,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_title:   OutputConfig {
                style_content: StyleConfig {
                    color: COLOR_TITLE,
                    bold: true,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_size:    OutputConfig {
                description: "Size:".into(),
                style_content: StyleConfig {
                    color: COLOR_SIZE,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_format:  OutputConfig {
                description: "Format:".into(),
                style_content: StyleConfig {
                    color: COLOR_FORMAT,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_caption: OutputConfig {
                style_content: StyleConfig {
                    color: COLOR_CAPTION,
                    italic: true,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_link:    OutputConfig {
                description: "Get:".into(),
                style_content: StyleConfig {
                    color: COLOR_LINK,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_status:  OutputConfig {
                style_content: StyleConfig {
                    color: COLOR_DIMMED,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_notice:  OutputConfig {
                prefix: "✓ ".into(),
                style_content: StyleConfig {
                    color: COLOR_NOTICE,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_error:   OutputConfig {
                description: "Error".into(),
                style_content: StyleConfig {
                    color: COLOR_ERROR,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub backend_url:   String,
    pub project_ref:   String,
    pub api_key:       String,
    pub bot_username:  String,
    pub link_base:     String,
    pub link_prefix:   String,
    pub table:         String,
    pub order:         String,
    pub count_total:   bool,
    pub listen:        String,
    pub default_limit: u32,
    pub max_limit:     u32,
    pub proxy_url:     String,
    pub page_size:     u32,
    pub debounce_ms:   u64,
    pub theme:         Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url:   "".into(),
            project_ref:   "".into(),
            api_key:       "".into(),
            bot_username:  "".into(),
            link_base:     "https://t.me".into(),
            link_prefix:   "filep_".into(),
            table:         "books".into(),
            order:         "_id.asc".into(),
            count_total:   true,
            listen:        "127.0.0.1:3000".into(),
            default_limit: 50,
            max_limit:     1000,
            proxy_url:     "http://127.0.0.1:3000".into(),
            page_size:     50,
            debounce_ms:   400,
            theme:         Theme::default(),
        }
    }
}

/// One source of configuration. Every key is optional so that layers can be stacked.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_url:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_ref:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key:       Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_username:  Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_base:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_prefix:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table:         Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order:         Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_total:   Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen:        Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit:     Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size:     Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms:   Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme:         Option<Theme>,
}

/// Environment variables that are read without the `BOOKDROP_` prefix.
fn well_known_env(key: &UncasedStr) -> Option<Uncased<'_>> {
    let mapped = match key.as_str().to_ascii_uppercase().as_str() {
        "SUPABASE_URL" => "backend_url",
        "SUPABASE_PROJECT_REF" => "project_ref",
        "SUPABASE_ANON_KEY" => "api_key",
        "TELEGRAM_BOT_USERNAME" => "bot_username",
        _ => return None,
    };
    Some(mapped.into())
}

impl ConfigLayer {
    pub fn from_storage(path: &Path) -> Result<Self, ConfigError> {
        Ok(Figment::from(Toml::file(path)).extract()?)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Figment::new()
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]))
            .merge(Env::raw().filter_map(well_known_env))
            .extract()?)
    }

    /// Build a layer from `KEY=VALUE` pairs, typing values the same way environment
    /// variables are typed.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self, ConfigError> {
        let mut dict = Dict::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidPair(pair.to_string()))?;
            let key = key.trim().to_ascii_lowercase();
            if !SETTABLE_KEYS.contains(&key.as_str()) {
                return Err(ConfigError::UnknownKey(key));
            }
            let value = match value.parse::<Value>() {
                Ok(value) => value,
                Err(never) => match never {},
            };
            dict.insert(key, value);
        }
        Ok(Figment::from(Serialized::defaults(dict)).extract()?)
    }

    /// Overwrite keys with every non-empty value of `other`.
    pub fn absorb(&mut self, other: &ConfigLayer) {
        fn take<T: Present + Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(value) = value.as_ref().filter(|v| v.is_present()) {
                *slot = Some(value.clone());
            }
        }
        take(&mut self.backend_url, &other.backend_url);
        take(&mut self.project_ref, &other.project_ref);
        take(&mut self.api_key, &other.api_key);
        take(&mut self.bot_username, &other.bot_username);
        take(&mut self.link_base, &other.link_base);
        take(&mut self.link_prefix, &other.link_prefix);
        take(&mut self.table, &other.table);
        take(&mut self.order, &other.order);
        take(&mut self.count_total, &other.count_total);
        take(&mut self.listen, &other.listen);
        take(&mut self.default_limit, &other.default_limit);
        take(&mut self.max_limit, &other.max_limit);
        take(&mut self.proxy_url, &other.proxy_url);
        take(&mut self.page_size, &other.page_size);
        take(&mut self.debounce_ms, &other.debounce_ms);
        take(&mut self.theme, &other.theme);
    }
}

/// Whether a value counts as set. Blank strings fall through to the next layer.
trait Present {
    fn is_present(&self) -> bool;
}

impl Present for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Present for bool {
    fn is_present(&self) -> bool {
        true
    }
}

impl Present for u32 {
    fn is_present(&self) -> bool {
        true
    }
}

impl Present for u64 {
    fn is_present(&self) -> bool {
        true
    }
}

impl Present for Theme {
    fn is_present(&self) -> bool {
        true
    }
}

fn pick<T, F>(layers: &[ConfigLayer], field: F) -> Option<T>
where
    T: Present + Clone,
    F: Fn(&ConfigLayer) -> Option<&T>,
{
    layers
        .iter()
        .filter_map(|layer| field(layer))
        .find(|value| value.is_present())
        .cloned()
}

/// Combine layers into a [Config], highest priority first. For every key the first layer
/// with a non-empty value wins, keys nobody sets keep their default.
pub fn resolve(layers: &[ConfigLayer]) -> Config {
    let d = Config::default();
    Config {
        backend_url:   pick(layers, |l| l.backend_url.as_ref()).unwrap_or(d.backend_url),
        project_ref:   pick(layers, |l| l.project_ref.as_ref()).unwrap_or(d.project_ref),
        api_key:       pick(layers, |l| l.api_key.as_ref()).unwrap_or(d.api_key),
        bot_username:  pick(layers, |l| l.bot_username.as_ref()).unwrap_or(d.bot_username),
        link_base:     pick(layers, |l| l.link_base.as_ref()).unwrap_or(d.link_base),
        link_prefix:   pick(layers, |l| l.link_prefix.as_ref()).unwrap_or(d.link_prefix),
        table:         pick(layers, |l| l.table.as_ref()).unwrap_or(d.table),
        order:         pick(layers, |l| l.order.as_ref()).unwrap_or(d.order),
        count_total:   pick(layers, |l| l.count_total.as_ref()).unwrap_or(d.count_total),
        listen:        pick(layers, |l| l.listen.as_ref()).unwrap_or(d.listen),
        default_limit: pick(layers, |l| l.default_limit.as_ref()).unwrap_or(d.default_limit),
        max_limit:     pick(layers, |l| l.max_limit.as_ref()).unwrap_or(d.max_limit),
        proxy_url:     pick(layers, |l| l.proxy_url.as_ref()).unwrap_or(d.proxy_url),
        page_size:     pick(layers, |l| l.page_size.as_ref()).unwrap_or(d.page_size),
        debounce_ms:   pick(layers, |l| l.debounce_ms.as_ref()).unwrap_or(d.debounce_ms),
        theme:         pick(layers, |l| l.theme.as_ref()).unwrap_or(d.theme),
    }
}

impl Config {
    pub fn default_as_string() -> Result<String, ConfigError> {
        Ok(toml::to_string(&Self::default())?)
    }

    pub fn as_string(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        if !redacted.api_key.is_empty() {
            redacted.api_key = "<set>".into();
        }
        Ok(toml::to_string(&redacted)?)
    }

    /// Location of the storage layer.
    pub fn storage_path() -> PathBuf {
        let raw = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        match shellexpand::path::full(Path::new(&raw)) {
            Ok(path) => path.into_owned(),
            Err(_) => PathBuf::from(raw),
        }
    }

    /// Storage > environment > defaults.
    pub fn read_config() -> Result<Self, ConfigError> {
        Self::read_from(&Self::storage_path())
    }

    pub fn read_from(storage: &Path) -> Result<Self, ConfigError> {
        let stored = ConfigLayer::from_storage(storage)?;
        let env = ConfigLayer::from_env()?;
        Ok(resolve(&[stored, env]))
    }

    /// Base URL of the backend, either given directly or derived from the project ref.
    pub fn backend_base(&self) -> Option<String> {
        if self.backend_url.is_present() {
            Some(self.backend_url.trim().trim_end_matches('/').to_string())
        } else if self.project_ref.is_present() {
            Some(format!("https://{}.supabase.co", self.project_ref.trim()))
        } else {
            None
        }
    }

    /// What the proxy needs to reach the backend. Location and key come as a pair.
    pub fn backend(&self) -> Result<BackendSettings, ConfigError> {
        let mut missing = vec![];
        let base = self.backend_base();
        if base.is_none() {
            missing.push("backend_url or project_ref");
        }
        if !self.api_key.is_present() {
            missing.push("api_key");
        }
        let base = match base {
            Some(base) if missing.is_empty() => base,
            _ => return Err(ConfigError::Missing(missing)),
        };
        let order = match self.order.trim() {
            ORDER_NONE => None,
            order => Some(order.to_string()),
        };
        let endpoint = Url::parse(&format!("{base}/"))?
            .join("rest/v1/")?
            .join(self.table.trim())?;
        Ok(BackendSettings {
            endpoint,
            api_key: self.api_key.trim().to_string(),
            order,
            count_total: self.count_total,
            default_limit: self.default_limit,
            max_limit: self.max_limit.max(1),
        })
    }

    /// Checks the whole group the browser depends on, reporting everything that is missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = vec![];
        if self.backend_base().is_none() {
            missing.push("backend_url or project_ref");
        }
        if !self.api_key.is_present() {
            missing.push("api_key");
        }
        if !self.bot_username.is_present() {
            missing.push("bot_username");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

/// Merge the non-empty values of `update` into the storage file.
///
/// The file is merged as plain TOML, so a key holding a value of the wrong type can still be
/// overwritten.
pub fn save(path: &Path, update: &ConfigLayer) -> Result<(), ConfigError> {
    let mut stored = match std::fs::read_to_string(path) {
        Ok(text) => toml::from_str::<toml::Table>(&text)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
        Err(e) => return Err(e.into()),
    };
    let mut present = ConfigLayer::default();
    present.absorb(update);
    if let toml::Value::Table(values) = toml::Value::try_from(&present)? {
        for (key, value) in values {
            stored.insert(key, value);
        }
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string(&stored)?)?;
    Ok(())
}

/// Remove the storage file. Returns whether there was anything to remove.
pub fn clear(path: &Path) -> Result<bool, ConfigError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
