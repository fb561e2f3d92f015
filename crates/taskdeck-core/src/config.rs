use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::calendar::DEFAULT_INDICATOR_CAP;
use crate::datetime::parse_weekday_name;
use crate::filter::DueDateSort;

pub const CONFIG_ENV_VAR: &str =
  "TASKDECK_CONFIG";

/// Settings flattened into dotted keys
/// (`[week] start = "monday"` becomes
/// `week.start`).
#[derive(Debug, Clone)]
pub struct Config {
  map: BTreeMap<String, String>,
  pub loaded_file: Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = BTreeMap::new();
    for (key, value) in [
      ("color", "on"),
      ("notify", "on"),
      ("week.start", "sunday"),
      ("calendar.indicators", "3"),
      ("list.sort", "none")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    Self {
      map,
      loaded_file: None
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match resolve_config_path(
      config_override
    )? {
      | Some(path) => {
        info!(config = %path.display(), "loading config");
        cfg.load_file(&path)?;
      }
      | None => {
        debug!(
          "no config file found; \
           using defaults"
        );
      }
    }

    Ok(cfg)
  }

  /// Parses TOML text on top of the
  /// defaults.
  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();
    cfg.merge_toml(text)?;
    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn color(&self) -> bool {
    self
      .get_bool("color")
      .unwrap_or(true)
  }

  pub fn notify(&self) -> bool {
    self
      .get_bool("notify")
      .unwrap_or(true)
  }

  pub fn timezone(
    &self
  ) -> Option<String> {
    self.get("time.timezone")
  }

  pub fn week_start(
    &self
  ) -> anyhow::Result<Weekday> {
    let raw = self
      .get("week.start")
      .unwrap_or_else(|| {
        "sunday".to_string()
      });
    match parse_weekday_name(&raw) {
      | Some(
        day @ (Weekday::Sun
        | Weekday::Mon)
      ) => Ok(day),
      | _ => {
        Err(anyhow!(
          "invalid week.start: {raw} \
           (expected sunday or \
           monday)"
        ))
      }
    }
  }

  pub fn indicator_cap(
    &self
  ) -> anyhow::Result<usize> {
    match self
      .get("calendar.indicators")
    {
      | Some(raw) => {
        raw
          .trim()
          .parse::<usize>()
          .with_context(|| {
            format!(
              "invalid \
               calendar.indicators: \
               {raw}"
            )
          })
      }
      | None => {
        Ok(DEFAULT_INDICATOR_CAP)
      }
    }
  }

  pub fn list_sort(
    &self
  ) -> anyhow::Result<DueDateSort> {
    match self.get("list.sort") {
      | Some(raw) => {
        raw.parse::<DueDateSort>()
          .context(
            "invalid list.sort"
          )
      }
      | None => Ok(DueDateSort::None)
    }
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .merge_toml(&text)
      .with_context(|| {
        format!(
          "failed to parse TOML {}",
          path.display()
        )
      })?;
    self.loaded_file = Some(path);
    Ok(())
  }

  fn merge_toml(
    &mut self,
    text: &str
  ) -> anyhow::Result<()> {
    let table =
      toml::from_str::<toml::Table>(
        text
      )
      .map_err(anyhow::Error::new)?;
    flatten_into(
      &mut self.map,
      "",
      &table
    );
    Ok(())
  }
}

fn flatten_into(
  map: &mut BTreeMap<String, String>,
  prefix: &str,
  table: &toml::Table
) {
  for (name, value) in table {
    let key = if prefix.is_empty() {
      name.clone()
    } else {
      format!("{prefix}.{name}")
    };

    let rendered = match value {
      | toml::Value::Table(inner) => {
        flatten_into(map, &key, inner);
        continue;
      }
      | toml::Value::String(text) => {
        text.clone()
      }
      | toml::Value::Integer(n) => {
        n.to_string()
      }
      | toml::Value::Float(n) => {
        n.to_string()
      }
      | toml::Value::Boolean(b) => {
        b.to_string()
      }
      | toml::Value::Datetime(dt) => {
        dt.to_string()
      }
      | toml::Value::Array(_) => {
        warn!(key = %key, "array values are not supported; skipping");
        continue;
      }
    };

    trace!(key = %key, value = %rendered, "loaded config key");
    map.insert(key, rendered);
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null"
      || env_path.trim().is_empty()
    {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      env_path
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    warn!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join("taskdeck")
    .join("config.toml");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::data_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine data \
         directory"
      )
    })?;
  Ok(base.join("taskdeck"))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
