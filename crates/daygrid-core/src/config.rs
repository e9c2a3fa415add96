use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Weekday;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map
            .insert("data.location".to_string(), "~/.daygrid".to_string());
        cfg.map
            .insert("default.command".to_string(), "agenda".to_string());
        cfg.map.insert("color".to_string(), "on".to_string());
        cfg.map
            .insert("week.start".to_string(), "sunday".to_string());

        let rc_path = resolve_rc_path(rc_override)?;
        if let Some(path) = rc_path {
            info!(rc = %path.display(), "loading daygridrc");
            cfg.load_file(&path)?;
        } else {
            debug!("no daygridrc found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    /// First day of the rendered week; an unrecognized value falls back to
    /// Sunday with a warning.
    pub fn week_start(&self) -> Weekday {
        match self
            .get("week.start")
            .unwrap_or_else(|| "sunday".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "monday" | "mon" => Weekday::Mon,
            "sunday" | "sun" => Weekday::Sun,
            "saturday" | "sat" => Weekday::Sat,
            other => {
                warn!(value = %other, "unrecognized week.start; using sunday");
                Weekday::Sun
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }
            if line.is_empty() {
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var("DAYGRIDRC") {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".daygridrc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".daygrid"))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Weekday;

    use super::Config;

    #[test]
    fn defaults_cover_the_known_keys() {
        let cfg = Config::load(Some(std::path::Path::new("/dev/null"))).expect("load");
        assert_eq!(cfg.get("default.command"), Some("agenda".to_string()));
        assert_eq!(cfg.get_bool("color"), Some(true));
        assert_eq!(cfg.week_start(), Weekday::Sun);
    }

    #[test]
    fn rc_file_and_overrides_win_over_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let rc = temp.path().join("daygridrc");
        let mut file = std::fs::File::create(&rc).expect("create rc");
        writeln!(file, "# comment").expect("write");
        writeln!(file, "week.start = monday").expect("write");
        writeln!(file, "color = off  # trailing comment").expect("write");

        let mut cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.week_start(), Weekday::Mon);
        assert_eq!(cfg.get_bool("color"), Some(false));

        cfg.apply_overrides(vec![("rc.week.start".to_string(), "sunday".to_string())]);
        assert_eq!(cfg.week_start(), Weekday::Sun);
    }

    #[test]
    fn unknown_week_start_falls_back_to_sunday() {
        let mut cfg = Config::load(Some(std::path::Path::new("/dev/null"))).expect("load");
        cfg.apply_overrides(vec![("week.start".to_string(), "caturday".to_string())]);
        assert_eq!(cfg.week_start(), Weekday::Sun);
    }
}
