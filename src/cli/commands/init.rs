//! Initialize command.

use std::path::{Path, PathBuf};

use medisort::config::{Config, Settings, CONFIG_BASENAME};

use crate::cli::icons;

const EXAMPLE_PATIENTS: &str = "# Format: ID,NOM,PRENOM\n1,DUPONT,Jean\n2,MARTIN,Marie\n3,BERNARD,Pierre\n";

/// Where `init` writes the config file.
fn config_target(explicit: Option<PathBuf>, config: &Config) -> PathBuf {
    explicit
        .or_else(|| config.source_path.clone())
        .or_else(|| dirs::config_dir().map(|d| d.join(CONFIG_BASENAME).join("config.toml")))
        .unwrap_or_else(|| PathBuf::from(format!("{}.toml", CONFIG_BASENAME)))
}

/// Write `contents` unless the file exists and `force` is off.
async fn write_file(path: &Path, contents: &str, force: bool) -> anyhow::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(true)
}

/// Create directories, an example patient file and a config file.
pub async fn cmd_init(
    settings: &Settings,
    config: &Config,
    config_path: Option<PathBuf>,
    force: bool,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    for dir in [&settings.inbox_dir, &settings.processed_dir, &settings.import_dir] {
        println!("  {} {}", icons::success(), dir.display());
    }

    let patients = &settings.patients.file;
    if write_file(patients, EXAMPLE_PATIENTS, force).await? {
        println!(
            "  {} Created example patient file {}",
            icons::success(),
            patients.display()
        );
        println!("    Replace the sample entries with your patients");
    } else {
        println!(
            "  {} Patient file exists: {}",
            icons::info(),
            patients.display()
        );
    }

    let target = config_target(config_path, config);
    let contents = Config::from_settings(settings).to_toml()?;
    if write_file(&target, &contents, force).await? {
        println!("  {} Wrote config {}", icons::success(), target.display());
    } else {
        println!(
            "  {} Config exists: {} (use --force to overwrite)",
            icons::info(),
            target.display()
        );
    }

    println!(
        "{} Initialized medisort; drop scans into {}",
        icons::success(),
        settings.inbox_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medisort::patients::parse_patient_list;
    use tempfile::TempDir;

    #[test]
    fn test_example_patients_parse() {
        let records = parse_patient_list(EXAMPLE_PATIENTS);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].lookup_key(), "DUPONT JEAN");
    }

    #[test]
    fn test_config_target_prefers_explicit_path() {
        let config = Config {
            source_path: Some(PathBuf::from("/etc/medisort.toml")),
            ..Config::default()
        };
        assert_eq!(
            config_target(Some(PathBuf::from("custom.toml")), &config),
            PathBuf::from("custom.toml")
        );
        assert_eq!(config_target(None, &config), PathBuf::from("/etc/medisort.toml"));
    }

    #[tokio::test]
    async fn test_init_writes_files_once() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_base_dir(dir.path().to_path_buf());
        let config_path = dir.path().join("medisort.toml");

        cmd_init(&settings, &Config::default(), Some(config_path.clone()), false)
            .await
            .unwrap();
        assert!(settings.inbox_dir.is_dir());
        assert!(settings.import_dir.is_dir());
        assert_eq!(
            std::fs::read_to_string(&settings.patients.file).unwrap(),
            EXAMPLE_PATIENTS
        );
        let written = Config::load_from_path(&config_path).await.unwrap();
        assert_eq!(written.ocr.language.as_deref(), Some("fra"));

        std::fs::write(&settings.patients.file, "id,nom,prenom\n9,ROUX,Anne\n").unwrap();
        cmd_init(&settings, &Config::default(), Some(config_path), false)
            .await
            .unwrap();
        assert!(std::fs::read_to_string(&settings.patients.file)
            .unwrap()
            .contains("ROUX"));
    }
}
