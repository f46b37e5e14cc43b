use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub messages: Messages,
}

// ── Bot identity ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    /// Text prefix that addresses the bot, e.g. `!`
    pub tag: String,
    /// Bot user id; its mention `<@id>` also addresses the bot
    pub self_id: u64,
    pub owner_id: u64,
    /// Accept the self-mention as an invocation trigger
    pub use_mention: bool,
    /// Master switch: when off, inbound messages are never dispatched
    pub enable_commands: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            tag: "!".into(),
            self_id: 0,
            owner_id: 0,
            use_mention: true,
            enable_commands: true,
        }
    }
}

// ── User-facing messages ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Messages {
    pub cmd_not_found: String,
    pub no_private: String,
    pub no_server: String,
    pub no_console: String,
    /// `%perm` is replaced by the missing permission path
    pub no_perm: String,
    /// `%s` is replaced by the requested command path
    pub help_not_found: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            cmd_not_found: "Command not found".into(),
            no_private: "This command cannot be executed in a private channel".into(),
            no_server: "This command cannot be executed on a server".into(),
            no_console: "This command cannot be executed on the console".into(),
            no_perm: "You need to have permission \"%perm\" to execute this command".into(),
            help_not_found: "Unknown command: %s".into(),
        }
    }
}

impl Messages {
    pub fn no_perm_for(&self, permission: &str) -> String {
        self.no_perm.replace("%perm", permission)
    }

    pub fn help_not_found_for(&self, path: &str) -> String {
        self.help_not_found.replace("%s", path)
    }
}

// ── Config impl ──────────────────────────────────────────────────

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".snowcmd"))
}

impl Config {
    /// Load `~/.snowcmd/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let config_dir = default_config_dir()?;
        let config_path = config_dir.join("config.toml");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create .snowcmd directory")?;
        }

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let mut config = Config {
                config_path: config_path.clone(),
                ..Config::default()
            };
            config.save()?;
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Load an explicit config file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config =
            toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_path = path.to_path_buf();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Invocation tag: SNOWCMD_TAG
        if let Some(tag) = lookup("SNOWCMD_TAG") {
            if !tag.is_empty() {
                self.bot.tag = tag;
            }
        }

        if let Some(id) = lookup("SNOWCMD_OWNER_ID").and_then(|v| v.trim().parse().ok()) {
            self.bot.owner_id = id;
        }

        if let Some(id) = lookup("SNOWCMD_SELF_ID").and_then(|v| v.trim().parse().ok()) {
            self.bot.self_id = id;
        }

        if let Some(val) = lookup("SNOWCMD_ENABLE_COMMANDS") {
            self.bot.enable_commands = val == "1" || val.eq_ignore_ascii_case("true");
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;
        fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("config.toml");
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &self.config_path) {
            let _ = fs::remove_file(&temp_path);
            anyhow::bail!("Failed to replace config file: {e}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    fn bot_config_default() {
        let b = BotConfig::default();
        assert_eq!(b.tag, "!");
        assert!(b.use_mention);
        assert!(b.enable_commands);
        assert_eq!(b.owner_id, 0);
    }

    #[test]
    fn messages_substitute_placeholders() {
        let m = Messages::default();
        assert_eq!(
            m.no_perm_for("music.play"),
            "You need to have permission \"music.play\" to execute this command"
        );
        assert_eq!(m.help_not_found_for("foo.bar"), "Unknown command: foo.bar");
    }

    // ── Serde ────────────────────────────────────────────────

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str(
            r#"
            [bot]
            tag = "?"
            owner_id = 42
            "#,
        )
        .unwrap();
        assert_eq!(c.bot.tag, "?");
        assert_eq!(c.bot.owner_id, 42);
        assert!(c.bot.use_mention);
        assert_eq!(c.messages, Messages::default());
    }

    #[test]
    fn save_then_load_from_preserves_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let mut config = Config {
            config_path: path.clone(),
            ..Config::default()
        };
        config.bot.self_id = 111_111_111_111_111_111;
        config.messages.cmd_not_found = "Unknown".into();
        config.save().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[bot]"));
        assert!(contents.contains("[messages]"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.config_path, path);
        assert_eq!(loaded.messages.cmd_not_found, "Unknown");
        assert_eq!(
            fs::read_dir(path.parent().unwrap()).unwrap().count(),
            1,
            "temporary file should be gone"
        );
    }

    #[test]
    fn load_from_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_from_rejects_bad_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[bot\ntag = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    // ── Env overrides ────────────────────────────────────────

    #[test]
    fn overrides_replace_bot_fields() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SNOWCMD_TAG", "$"),
            ("SNOWCMD_OWNER_ID", " 7 "),
            ("SNOWCMD_SELF_ID", "9"),
            ("SNOWCMD_ENABLE_COMMANDS", "false"),
        ]);
        let mut c = Config::default();
        c.apply_overrides_from(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(c.bot.tag, "$");
        assert_eq!(c.bot.owner_id, 7);
        assert_eq!(c.bot.self_id, 9);
        assert!(!c.bot.enable_commands);
    }

    #[test]
    fn empty_or_unparsable_overrides_are_ignored() {
        let env: HashMap<&str, &str> =
            HashMap::from([("SNOWCMD_TAG", ""), ("SNOWCMD_OWNER_ID", "not-a-number")]);
        let mut c = Config::default();
        c.bot.owner_id = 5;
        c.apply_overrides_from(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(c.bot.tag, "!");
        assert_eq!(c.bot.owner_id, 5);
        assert!(c.bot.enable_commands);
    }
}
