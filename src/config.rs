//! Process configuration
//!
//! Resolved once at startup from the environment (a `.env` file is loaded by
//! the binary first) and shared read-only afterwards.

use std::path::{Path, PathBuf};

pub const DEFAULT_TEMPLATE_PATH: &str = "templates/衣笠クラブ企画書フォーマット.docx";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_STATIC_DIR: &str = "frontend";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// The DOCX template, read fresh for every request
    pub template_path: PathBuf,
    /// Where generated documents are written and served from
    pub output_dir: PathBuf,
    /// Front-end root: `index.html`, assets under `public/`
    pub static_dir: PathBuf,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    pub fn new(template_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Read `DOCGEN_*` variables, falling back to the defaults.
    ///
    /// `DOCGEN_BIND_ADDR` wins over `PORT`; `PORT` alone binds all interfaces.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let bind_addr = var("DOCGEN_BIND_ADDR")
            .or_else(|| {
                var("PORT")
                    .and_then(|port| port.trim().parse::<u16>().ok())
                    .map(|port| format!("0.0.0.0:{}", port))
            })
            .unwrap_or(defaults.bind_addr);

        Self {
            template_path: var("DOCGEN_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_path),
            output_dir: var("DOCGEN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            static_dir: var("DOCGEN_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            bind_addr,
        }
    }

    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    pub fn template_exists(&self) -> bool {
        self.template_path.is_file()
    }

    /// Remediation shown to clients when the template is missing
    pub fn template_hint(&self) -> String {
        let dir = self
            .template_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file = self
            .template_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.template_path.display().to_string());
        format!("{}/ に{} を置いてください。", dir.display(), file)
    }

    pub fn ensure_output_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
    }

    pub fn index_file(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.static_dir.join("public")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])), AppConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DOCGEN_TEMPLATE", "/srv/tpl.docx"),
            ("DOCGEN_OUTPUT_DIR", "/srv/out"),
            ("DOCGEN_STATIC_DIR", ""),
            ("PORT", "8080"),
        ]));
        assert_eq!(config.template_path, PathBuf::from("/srv/tpl.docx"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.static_dir, PathBuf::from(DEFAULT_STATIC_DIR));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_bind_addr_beats_port() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DOCGEN_BIND_ADDR", "127.0.0.1:9000"),
            ("PORT", "8080"),
        ]));
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_builder_overrides_and_static_paths() {
        let config = AppConfig::default()
            .with_template("a/t.docx")
            .with_output_dir("out2")
            .with_static_dir("web");
        assert_eq!(config.template_path, PathBuf::from("a/t.docx"));
        assert_eq!(config.output_dir, PathBuf::from("out2"));
        assert_eq!(config.index_file(), PathBuf::from("web/index.html"));
        assert_eq!(config.public_dir(), PathBuf::from("web/public"));
        assert!(!config.template_exists());
    }

    #[test]
    fn test_template_hint_names_directory_and_file() {
        let config = AppConfig::default();
        assert_eq!(
            config.template_hint(),
            "templates/ に衣笠クラブ企画書フォーマット.docx を置いてください。"
        );
    }
}
