//! `.env` file parsing.
//!
//! Deployments keep their settings in a `KEY=value` file next to the
//! binary. Lines that do not parse are ignored rather than rejected, the
//! same way dotenv loaders behave.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Parses `.env` content into a map of settings.
///
/// # Supported Formats
///
/// - Simple: `KEY=value`
/// - Exported: `export KEY=value`
/// - Quoted: `KEY="value with spaces"` or `KEY='single quoted'`
/// - Empty: `KEY=`
/// - Comments: `# This is a comment`
/// - Values with equals signs: `URL=https://example.com?foo=bar`
///
/// # Example
///
/// ```
/// use mcgov::config::EnvFile;
///
/// let vars = EnvFile::parse(r#"
/// # Target
/// TARGET_INSTANCE_LABEL=mc-1
/// export TARGET_INSTANCE_REGION="ams"
/// "#);
/// assert_eq!(vars.get("TARGET_INSTANCE_LABEL").map(String::as_str), Some("mc-1"));
/// assert_eq!(vars.get("TARGET_INSTANCE_REGION").map(String::as_str), Some("ams"));
/// ```
pub struct EnvFile;

impl EnvFile {
    /// Parse env file content.
    pub fn parse(content: &str) -> HashMap<String, String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(Self::parse_line)
            .collect()
    }

    fn parse_line(line: &str) -> Option<(String, String)> {
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some((key.to_string(), Self::unquote(value.trim())))
    }

    fn unquote(value: &str) -> String {
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if quoted {
            value[1..value.len() - 1].to_string()
        } else {
            value.to_string()
        }
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<HashMap<String, String>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Like [`EnvFile::load`], but a missing file yields an empty map.
    pub fn load_optional(path: &Path) -> Result<HashMap<String, String>> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(HashMap::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pairs() {
        let vars = EnvFile::parse("KEY1=value1\nKEY2=value2\n");
        assert_eq!(vars.get("KEY1"), Some(&"value1".to_string()));
        assert_eq!(vars.get("KEY2"), Some(&"value2".to_string()));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let content = r#"
# comment

KEY=value
# trailing
"#;
        let vars = EnvFile::parse(content);
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn strips_quotes() {
        let content = "DOUBLE=\"a b\"\nSINGLE='c d'\nLONE=\"\n";
        let vars = EnvFile::parse(content);
        assert_eq!(vars.get("DOUBLE"), Some(&"a b".to_string()));
        assert_eq!(vars.get("SINGLE"), Some(&"c d".to_string()));
        assert_eq!(vars.get("LONE"), Some(&"\"".to_string()));
    }

    #[test]
    fn keeps_equals_in_values() {
        let vars = EnvFile::parse("VULTR_API_URL=https://example.com/v2?x=y");
        assert_eq!(
            vars.get("VULTR_API_URL"),
            Some(&"https://example.com/v2?x=y".to_string())
        );
    }

    #[test]
    fn accepts_export_prefix() {
        let vars = EnvFile::parse("export TARGET_SCRIPT_ID = abc");
        assert_eq!(vars.get("TARGET_SCRIPT_ID"), Some(&"abc".to_string()));
    }

    #[test]
    fn ignores_malformed_lines() {
        let vars = EnvFile::parse("KEY1=v\nno equals here\n=orphan\nKEY2=w");
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn load_optional_missing_file_is_empty() {
        let vars = EnvFile::load_optional(Path::new("/nonexistent/path/.env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(&path, "TARGET_BLOCK_LABEL=world\n").unwrap();

        let vars = EnvFile::load(&path).unwrap();
        assert_eq!(vars.get("TARGET_BLOCK_LABEL"), Some(&"world".to_string()));
    }
}
