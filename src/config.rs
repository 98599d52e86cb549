//! Key=value configuration file parsing.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: String,
    pub web_port: u16,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self { db_path: "hfreceiver.db".to_string(), web_port: 8080, log_level: "info".to_string() }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(contents: &str) -> Self {
        let mut config = Self::default();

        for raw_line in contents.lines() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before,
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "db_path" => config.db_path = value.to_string(),
                "web_port" => {
                    if let Ok(port) = value.parse() {
                        config.web_port = port;
                    }
                }
                "log_level" => {
                    if matches!(value, "debug" | "info" | "warn" | "error") {
                        config.log_level = value.to_string();
                    }
                }
                _ => {}
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_keys_and_ignores_comments_and_unknowns() {
        let contents = "db_path=/tmp/x.db # comment\n\nfoo=bar\n";
        let config = Config::parse(contents);
        assert_eq!(config.db_path, "/tmp/x.db");
        assert_eq!(config.web_port, Config::default().web_port);
        assert_eq!(config.log_level, Config::default().log_level);
    }

    #[test]
    fn parses_web_port_and_log_level() {
        let contents = "web_port=9090\nlog_level=debug\n";
        let config = Config::parse(contents);
        assert_eq!(config.web_port, 9090);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn rejects_invalid_log_level() {
        let contents = "log_level=verbose\n";
        let config = Config::parse(contents);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/path/to/config.ini");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn loads_from_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hfreceiver.conf");
        fs::write(&path, "db_path=/tmp/x.db # comment\n\nfoo=bar\n").unwrap();

        let config = Config::load(&path);
        assert_eq!(config.db_path, "/tmp/x.db");
    }

    #[test]
    fn blank_lines_and_bare_comments_are_ignored() {
        let contents = "\n# just a comment\n   \nweb_port=1234\n";
        let config = Config::parse(contents);
        assert_eq!(config.web_port, 1234);
    }
}
