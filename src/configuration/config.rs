#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::collections::HashMap;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ApiUrl,
    ConfigFile,
    TokenFile,
    RequestTimeout,
    PageSize,
    MessagePageSize,
    ContextMessages,
}

impl ConfigKey {
    fn is_numeric(&self) -> bool {
        return matches!(
            self,
            ConfigKey::RequestTimeout
                | ConfigKey::PageSize
                | ConfigKey::MessagePageSize
                | ConfigKey::ContextMessages
        );
    }
}

/// Numeric keys only accept whole numbers above zero.
fn parse_number(val: &str) -> Option<u32> {
    return val.parse::<u32>().ok().filter(|e| return *e > 0);
}

fn app_dir(base: Option<path::PathBuf>) -> path::PathBuf {
    return base.unwrap_or_else(|| return path::PathBuf::from(".")).join("chatsim");
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    /// Numeric value of `key`, or its default when unset or malformed.
    pub fn get_number(key: ConfigKey) -> u32 {
        if let Some(val) = parse_number(&Config::get(key)) {
            return val;
        }
        return parse_number(&Config::default(key)).unwrap_or_default();
    }

    pub fn default(key: ConfigKey) -> String {
        let res = match key {
            ConfigKey::ApiUrl => "http://localhost:8000".to_string(),
            ConfigKey::RequestTimeout => "30000".to_string(),
            ConfigKey::PageSize => "20".to_string(),
            ConfigKey::MessagePageSize => "50".to_string(),
            ConfigKey::ContextMessages => "10".to_string(),

            // Special
            ConfigKey::ConfigFile => app_dir(dirs::config_dir())
                .join("config.toml")
                .to_string_lossy()
                .to_string(),
            ConfigKey::TokenFile => app_dir(dirs::cache_dir())
                .join("tokens.json")
                .to_string_lossy()
                .to_string(),
        };

        return res;
    }

    /// Resolves every key from defaults, then the config file, then flags and
    /// environment variables. Nothing is applied when any layer is invalid.
    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        let mut values: HashMap<ConfigKey, String> = HashMap::new();
        for key in ConfigKey::iter() {
            values.insert(key, Config::default(key));
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }
        values.insert(ConfigKey::ConfigFile, config_file.to_string());

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    // Use clap value parsers to do validation.
                    let mut possible_values = vec![];
                    if let Some(arg) = cmd
                        .get_arguments()
                        .find(|e| return e.get_long() == Some(key.to_string().as_str()))
                    {
                        possible_values = arg
                            .get_possible_values()
                            .iter()
                            .map(|e| return e.get_name().to_string())
                            .collect::<Vec<String>>();
                    }

                    if let Some(val_int) = val.as_integer() {
                        if key.is_numeric() && parse_number(&val_int.to_string()).is_none() {
                            bail!(format!("config.toml has an invalid value for key '{key}': {val_int}\nExpected a whole number greater than 0"));
                        }
                        values.insert(key, val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        if key.is_numeric() && parse_number(val_str).is_none() {
                            bail!(format!("config.toml has an invalid value for key '{key}': {val_str}\nExpected a whole number greater than 0"));
                        }
                        if !possible_values.is_empty()
                            && !possible_values.contains(&val_str.to_string())
                        {
                            bail!(format!("config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}", possible_values.join(", ")));
                        }
                        values.insert(key, val_str.to_string());
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    if key.is_numeric() && parse_number(val).is_none() {
                        bail!(format!("Invalid value for '--{key}': {val}"));
                    }
                    values.insert(key, val.to_string());
                }
            }
        }

        for (key, val) in values.iter() {
            Config::set(*key, val);
        }

        tracing::debug!(
            api_url = Config::get(ConfigKey::ApiUrl),
            config_file = Config::get(ConfigKey::ConfigFile),
            token_file = Config::get(ConfigKey::TokenFile),
            request_timeout = Config::get(ConfigKey::RequestTimeout),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let description = arg
                    .get_help()?
                    .to_string()
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                // Paths depend on the machine, so they stay commented out.
                if key == ConfigKey::TokenFile {
                    return Some(format!("# {description}\n# {key} = \"\""));
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if key.is_numeric() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
