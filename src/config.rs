use crate::access::AccessRule;
use crate::error::FmError;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Server listening address
    pub addr: String,

    /// Managed root folder; everything the server exposes lives below it
    pub root_path: PathBuf,

    /// Max upload size per file in bytes
    pub max_file_size: u64,

    /// Optional JSON file with the ordered access rule list
    pub access_rules: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Self {
        let mut addr = std::env::var("ADDR").unwrap_or_else(|_| "0.0.0.0:9690".to_string());
        let mut root_path =
            PathBuf::from(std::env::var("ROOT_PATH").unwrap_or_else(|_| "./files".to_string()));
        let mut max_file_size = std::env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10485760);
        let mut access_rules = std::env::var("ACCESS_RULES").ok().map(PathBuf::from);

        // Check command line args for overrides (simple implementation)
        for arg in std::env::args() {
            if arg.starts_with("--addr=") {
                addr = arg.trim_start_matches("--addr=").to_string();
            } else if arg.starts_with("--root-path=") {
                root_path = PathBuf::from(arg.trim_start_matches("--root-path="));
            } else if arg.starts_with("--max-file-size=") {
                if let Ok(size) = arg.trim_start_matches("--max-file-size=").parse::<u64>() {
                    max_file_size = size;
                }
            } else if arg.starts_with("--access-rules=") {
                access_rules = Some(PathBuf::from(arg.trim_start_matches("--access-rules=")));
            }
        }

        Config {
            addr,
            root_path,
            max_file_size,
            access_rules,
        }
    }

    /// Read and parse the rule file if one is configured. `None` means
    /// no rules at all, which the engine treats as fully open.
    pub fn load_rules(&self) -> Result<Option<Vec<AccessRule>>, FmError> {
        match &self.access_rules {
            None => Ok(None),
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let rules: Vec<AccessRule> = serde_json::from_str(&raw)?;
                Ok(Some(rules))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_rules_reads_the_configured_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"path": "/docs/*.txt", "isFile": true, "read": true}}]"#
        )
        .unwrap();

        let config = Config {
            addr: "127.0.0.1:0".to_string(),
            root_path: PathBuf::from("."),
            max_file_size: 1024,
            access_rules: Some(file.path().to_path_buf()),
        };
        let rules = config.load_rules().unwrap().unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].is_file && rules[0].read);
    }

    #[test]
    fn no_rule_file_means_no_rules() {
        let config = Config {
            addr: "127.0.0.1:0".to_string(),
            root_path: PathBuf::from("."),
            max_file_size: 1024,
            access_rules: None,
        };
        assert!(config.load_rules().unwrap().is_none());
    }
}
