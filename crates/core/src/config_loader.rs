use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by merging TOML, environment variables, and JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed, or
    /// if the merged configuration fails validation.
    pub fn load() -> Result<AppConfig> {
        Self::load_from_dir("config")
    }

    /// Loads configuration from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed, or
    /// if the merged configuration fails validation.
    pub fn load_from_dir(dir: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(format!("{dir}/Config.toml")))
            .merge(Env::prefixed("SCREENER_").split("__"))
            .join(Json::file(format!("{dir}/Config.json")))
            .extract()?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_files_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from_dir("config").expect("defaults load");
            assert_eq!(config.screener.concurrency, 4);
            Ok(())
        });
    }

    #[test]
    fn test_load_merges_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [screener]
                concurrency = 12
                price_tolerance = 0.1
                "#,
            )?;
            let config = ConfigLoader::load_from_dir("config").expect("toml load");
            assert_eq!(config.screener.concurrency, 12);
            assert!((config.screener.price_tolerance - 0.1).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [screener]
                concurrency = 12
                "#,
            )?;
            jail.set_env("SCREENER_SCREENER__CONCURRENCY", "2");
            let config = ConfigLoader::load_from_dir("config").expect("env override");
            assert_eq!(config.screener.concurrency, 2);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [screener]
                concurrency = 64
                "#,
            )?;
            assert!(ConfigLoader::load_from_dir("config").is_err());
            Ok(())
        });
    }
}
