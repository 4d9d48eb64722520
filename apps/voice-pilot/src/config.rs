use anyhow::{Context, Result};
use flight_control::FlightConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use voice_local::plugin::TranscriptBackendKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fly the in-process simulated vehicle
    pub simulation: bool,
    pub transcript_backend: TranscriptBackendKind,
    /// Utterances replayed by the `script` backend
    pub script: Vec<String>,
    pub log_dir: Option<String>,
    pub allow_poweroff: bool,
    pub flight: FlightConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: false,
            transcript_backend: TranscriptBackendKind::Stdin,
            script: Vec::new(),
            log_dir: None,
            allow_poweroff: false,
            flight: FlightConfig::default(),
        }
    }
}

impl Config {
    /// Read `path`, or write the defaults there and use them.
    pub fn load(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            let contents =
                fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
            Ok(serde_json::from_str(&contents)
                .with_context(|| format!("parsing config {}", path))?)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing config {}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("voice-pilot-{}-{}", name, std::process::id()));
        dir.to_string_lossy().into_owned()
    }

    #[test]
    fn missing_file_writes_defaults() {
        let path = temp_path("defaults.json");
        let _ = fs::remove_file(&path);

        let config = Config::load(&path).unwrap();
        assert!(!config.simulation);
        assert!(Path::new(&path).exists());

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(
            reloaded.flight.connection_address,
            config.flight.connection_address
        );
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let path = temp_path("partial.json");
        fs::write(
            &path,
            r#"{"simulation":true,"transcript_backend":"script","script":["arm","takeoff"]}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.simulation);
        assert_eq!(config.transcript_backend, TranscriptBackendKind::Script);
        assert_eq!(config.script.len(), 2);
        assert_eq!(config.flight.retry.max_attempts, 3);
        let _ = fs::remove_file(&path);
    }
}
