use serde::Deserialize;
use std::path::PathBuf;

use crate::error::RecorderError;

/// Subdirectory of `localStoragePath` holding audio of open captures
const SPOOL_DIR: &str = ".capture";

/// Bot configuration, read once at startup
///
/// The `config` crate lowercases keys read from files, hence the lowercase
/// aliases next to the camelCase names.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Command prefix used by the gateway bridge's text commands
    pub prefix: String,

    /// Container/codec extension of recorded files (e.g. "wav", "mp3")
    #[serde(alias = "recordingformat")]
    pub recording_format: String,

    /// Target bitrate in kbps; handed to the bridge (in bps) for non-WAV encoding
    #[serde(default = "default_bitrate", alias = "recordingbitrate")]
    pub recording_bitrate: u32,

    /// Directory where recordings are written before upload
    #[serde(alias = "localstoragepath")]
    pub local_storage_path: String,

    /// Delete the local file once the upload is confirmed
    #[serde(default = "default_true", alias = "autodeletelocalfiles")]
    pub auto_delete_local_files: bool,

    /// Destination folder for uploads; Drive root when unset
    #[serde(default, alias = "googledrivefolderid")]
    pub google_drive_folder_id: Option<String>,

    #[serde(default, alias = "loglevel")]
    pub log_level: Option<String>,

    /// Holds `combined.log` and `error.log`, rotated daily
    #[serde(default = "default_log_directory", alias = "logdirectory")]
    pub log_directory: String,

    #[serde(alias = "messagetemplates")]
    pub message_templates: MessageTemplates,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default, alias = "googledrive")]
    pub google_drive: GoogleDriveConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplates {
    #[serde(alias = "recordingstart")]
    pub recording_start: String,
    #[serde(alias = "recordingend")]
    pub recording_end: String,
    /// `{link}` is replaced with the share link
    #[serde(alias = "sharelink")]
    pub share_link: String,
}

impl MessageTemplates {
    pub fn share_link(&self, link: &str) -> String {
        self.share_link.replace("{link}", link)
    }
}

/// PCM layout of audio delivered by the voice bridge
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    #[serde(alias = "samplerate")]
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    #[serde(alias = "apibase")]
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleDriveConfig {
    #[serde(alias = "credentialspath")]
    pub credentials_path: String,
    #[serde(alias = "tokenpath")]
    pub token_path: String,
}

impl Default for GoogleDriveConfig {
    fn default() -> Self {
        Self {
            credentials_path: "credentials/google-credentials.json".to_string(),
            token_path: "credentials/token.json".to_string(),
        }
    }
}

fn default_bitrate() -> u32 {
    128
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load and validate the config document. `path` may omit the extension.
    pub fn load(path: &str) -> Result<Self, RecorderError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| RecorderError::Config(format!("failed to read {}: {}", path, e)))?;

        let cfg: Config = settings
            .try_deserialize()
            .map_err(|e| RecorderError::Config(format!("invalid config {}: {}", path, e)))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a JSON document directly (used by tests and embedders)
    pub fn from_json(json: &str) -> Result<Self, RecorderError> {
        let cfg: Config = serde_json::from_str(json)
            .map_err(|e| RecorderError::Config(format!("invalid config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.recording_format.is_empty()
            || !self.recording_format.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(RecorderError::Config(format!(
                "recordingFormat must be a plain extension, got {:?}",
                self.recording_format
            )));
        }

        if self.recording_bitrate == 0 {
            return Err(RecorderError::Config(
                "recordingBitrate must be positive".to_string(),
            ));
        }

        if !self.message_templates.share_link.contains("{link}") {
            return Err(RecorderError::Config(
                "messageTemplates.shareLink must contain {link}".to_string(),
            ));
        }

        if self.capture.sample_rate == 0 || self.capture.channels == 0 {
            return Err(RecorderError::Config(
                "capture.sampleRate and capture.channels must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// `localStoragePath` with `~` and environment variables expanded
    pub fn storage_dir(&self) -> PathBuf {
        match shellexpand::full(&self.local_storage_path) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(&self.local_storage_path),
        }
    }

    /// Where the capture sink spools per-speaker audio until stop
    pub fn spool_dir(&self) -> PathBuf {
        self.storage_dir().join(SPOOL_DIR)
    }

    pub fn bitrate_bps(&self) -> u32 {
        self.recording_bitrate.saturating_mul(1000)
    }

    pub fn is_wav(&self) -> bool {
        self.recording_format.eq_ignore_ascii_case("wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "prefix": "!",
        "recordingFormat": "wav",
        "localStoragePath": "./recordings",
        "messageTemplates": {
            "recordingStart": "Recording started",
            "recordingEnd": "Recording finished",
            "shareLink": "Listen here: {link}"
        }
    }"#;

    #[test]
    fn test_defaults_applied() {
        let cfg = Config::from_json(MINIMAL).unwrap();

        assert_eq!(cfg.recording_bitrate, 128);
        assert!(cfg.auto_delete_local_files);
        assert!(cfg.google_drive_folder_id.is_none());
        assert_eq!(cfg.capture.sample_rate, 48000);
        assert_eq!(cfg.capture.channels, 2);
        assert_eq!(cfg.http.port, 8787);
        assert_eq!(cfg.bitrate_bps(), 128_000);
        assert_eq!(cfg.log_directory, "logs");
        assert!(cfg.is_wav());
    }

    #[test]
    fn test_share_link_substitution() {
        let cfg = Config::from_json(MINIMAL).unwrap();
        assert_eq!(
            cfg.message_templates.share_link("https://drive/x"),
            "Listen here: https://drive/x"
        );
    }

    #[test]
    fn test_rejects_bad_format() {
        let json = MINIMAL.replace("\"wav\"", "\"../wav\"");
        assert!(matches!(
            Config::from_json(&json),
            Err(RecorderError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_share_link_without_placeholder() {
        let json = MINIMAL.replace("Listen here: {link}", "Listen here");
        assert!(Config::from_json(&json).is_err());
    }

    #[test]
    fn test_missing_templates_is_config_error() {
        let json = r#"{"prefix": "!", "recordingFormat": "mp3", "localStoragePath": "x"}"#;
        assert!(matches!(
            Config::from_json(json),
            Err(RecorderError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, MINIMAL.replace("./recordings", "~/recordings")).unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.recording_format, "wav");
        assert_eq!(cfg.message_templates.recording_start, "Recording started");
        assert!(cfg.storage_dir().ends_with("recordings"));
        assert!(cfg.spool_dir().starts_with(cfg.storage_dir()));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/vc-recorder/config.json"),
            Err(RecorderError::Config(_))
        ));
    }
}
