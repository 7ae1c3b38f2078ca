use anyhow::{Context, Result};
use directories::ProjectDirs;
use repodeck_core::ports::{AppConfig, ConfigStore};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const CONFIG_ENV: &str = "REPODECK_CONFIG";

/// TOML configuration file, created with defaults on first load
pub struct FileConfigStore {
    config_path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Result<Self> {
        let config_path = Self::default_path()?;
        Ok(Self { config_path })
    }

    pub fn with_path<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// An explicit path wins over the platform default
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        match explicit {
            Some(path) => Ok(Self::with_path(path)),
            None => Self::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "repodeck")
            .context("Failed to determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Create default config if it doesn't exist
    fn ensure_config_exists(&self) -> Result<()> {
        if !self.config_path.exists() {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            self.save(&AppConfig::default())?;
        }
        Ok(())
    }

    /// Directory relative paths in the config resolve against
    fn base_dir(&self) -> PathBuf {
        let absolute = std::path::absolute(&self.config_path).unwrap_or_else(|_| self.config_path.clone());
        absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    fn expand(&self, config: &mut AppConfig) {
        let base = self.base_dir();

        config.store.dir = expand_path(&base, &config.store.dir);
        if let Some(file) = &config.logs.file {
            config.logs.file = Some(expand_path(&base, file));
        }
        for dotenv in &mut config.dotenvs {
            *dotenv = expand_path(&base, dotenv);
        }

        let dirs = &mut config.clone_directories;
        dirs.default = expand_template(&base, &dirs.default);
        for matcher in &mut dirs.matchers {
            matcher.dir = expand_template(&base, &matcher.dir);
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<AppConfig> {
        self.ensure_config_exists()?;

        let contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {}", self.config_path.display()))?;

        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", self.config_path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", self.config_path.display()))?;

        self.expand(&mut config);

        for dotenv in &config.dotenvs {
            dotenvy::from_path(dotenv)
                .with_context(|| format!("Failed to load dotenv file: {}", dotenv.display()))?;
        }

        debug!(path = %self.config_path.display(), "loaded config");
        Ok(config)
    }

    fn save(&self, config: &AppConfig) -> Result<()> {
        let contents = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;

        fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", self.config_path.display()))?;

        Ok(())
    }
}

/// Expand a leading `~` and resolve relative paths against `base`
pub fn expand_path(base: &Path, path: &Path) -> PathBuf {
    let mut components = path.components();
    if let Some(Component::Normal(first)) = components.next() {
        if first == "~" {
            if let Some(home) = dirs::home_dir() {
                return home.join(components.as_path());
            }
        }
    }

    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Like [`expand_path`], for directory templates. A template starting with
/// an action is left alone since its root is only known after rendering.
pub fn expand_template(base: &Path, template: &str) -> String {
    if template.starts_with("{{") {
        return template.to_string();
    }
    expand_path(base, Path::new(template)).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodeck_core::commander::{KeyCommand, Mode};
    use repodeck_core::ports::LogFormat;
    use tempfile::TempDir;

    #[test]
    fn test_config_load_nonexistent_creates_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nonexistent.toml");

        let store = FileConfigStore::with_path(&config_path);
        let config = store.load()?;

        assert!(config.sources.is_empty());
        assert_eq!(config.key_bindings.len(), 3);
        assert!(config_path.exists());

        // relative store directory lands next to the config file
        assert_eq!(config.store.dir, std::path::absolute(temp_dir.path())?.join("store"));
        Ok(())
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test.toml");
        let store = FileConfigStore::with_path(&config_path);

        let mut config = AppConfig {
            concurrency: 2,
            shell: "bash".to_string(),
            ..AppConfig::default()
        };
        config.store.dir = PathBuf::from("/custom/store");
        config.logs.format = LogFormat::Json;
        config
            .key_bindings
            .insert("ctrl+e", KeyCommand::new("vim", "edit", Mode::Interactive));

        store.save(&config)?;
        let loaded = store.load()?;

        assert_eq!(loaded.concurrency, 2);
        assert_eq!(loaded.shell, "bash");
        assert_eq!(loaded.store.dir, PathBuf::from("/custom/store"));
        assert_eq!(loaded.logs.format, LogFormat::Json);
        assert_eq!(loaded.key_bindings, config.key_bindings);
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(
            &config_path,
            r#"
            [key_bindings."ctrl+c"]
            cmd = "echo"
            "#,
        )?;

        let err = FileConfigStore::with_path(&config_path).load().unwrap_err();
        assert!(format!("{err:#}").contains("reserved"), "{err:#}");
        Ok(())
    }

    #[test]
    fn test_dotenvs_are_loaded() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("tokens.env"), "REPODECK_TEST_DOTENV_TOKEN=from-dotenv\n")?;
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "dotenvs = [\"tokens.env\"]\n")?;

        FileConfigStore::with_path(&config_path).load()?;
        assert_eq!(std::env::var("REPODECK_TEST_DOTENV_TOKEN")?, "from-dotenv");
        Ok(())
    }

    #[test]
    fn test_expand_path() {
        let base = Path::new("/etc/repodeck");
        assert_eq!(expand_path(base, Path::new("store")), PathBuf::from("/etc/repodeck/store"));
        assert_eq!(expand_path(base, Path::new("/var/store")), PathBuf::from("/var/store"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path(base, Path::new("~/src")), home.join("src"));
            assert_eq!(
                expand_template(base, "~/src/{{ .Repo.Name }}"),
                home.join("src/{{ .Repo.Name }}").to_string_lossy()
            );
        }
        assert_eq!(expand_template(base, "{{ .Repo.Name }}"), "{{ .Repo.Name }}");
    }

    #[test]
    fn test_default_path() -> Result<()> {
        let path = FileConfigStore::default_path()?;
        assert!(path.ends_with("repodeck/config.toml") || path.ends_with("config.toml"));
        Ok(())
    }
}
