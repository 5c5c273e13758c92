use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read tweets file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not a JSON array of strings: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{} contains no tweets", .path.display())]
    Empty { path: PathBuf },
}

/// Load the pre-written tweets. The file must hold a single JSON array of strings.
pub fn load_tweets(path: &Path) -> Result<Vec<String>, CorpusError> {
    let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let tweets: Vec<String> =
        serde_json::from_str(&content).map_err(|source| CorpusError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    if tweets.is_empty() {
        return Err(CorpusError::Empty {
            path: path.to_path_buf(),
        });
    }

    tracing::info!("Loaded {} tweets from {}", tweets.len(), path.display());
    Ok(tweets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_corpus(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("tweets.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_tweets_in_order() {
        let dir = tempdir().unwrap();
        let path = write_corpus(dir.path(), r#"["gm porkelon", "wagmi 🐷", "hello world"]"#);

        let tweets = load_tweets(&path).unwrap();
        assert_eq!(tweets, vec!["gm porkelon", "wagmi 🐷", "hello world"]);
    }

    #[test]
    fn missing_file() {
        let dir = tempdir().unwrap();
        let err = load_tweets(&dir.path().join("tweets.json")).unwrap_err();
        assert!(matches!(err, CorpusError::Read { .. }));
    }

    #[test]
    fn rejects_non_string_entries() {
        let dir = tempdir().unwrap();
        let path = write_corpus(dir.path(), r#"["ok", 42]"#);
        assert!(matches!(
            load_tweets(&path).unwrap_err(),
            CorpusError::Malformed { .. }
        ));
    }

    #[test]
    fn rejects_object_at_top_level() {
        let dir = tempdir().unwrap();
        let path = write_corpus(dir.path(), r#"{"tweets": ["ok"]}"#);
        assert!(matches!(
            load_tweets(&path).unwrap_err(),
            CorpusError::Malformed { .. }
        ));
    }

    #[test]
    fn rejects_empty_array() {
        let dir = tempdir().unwrap();
        let path = write_corpus(dir.path(), "[]");
        let err = load_tweets(&path).unwrap_err();
        assert!(matches!(err, CorpusError::Empty { .. }));
        assert!(err.to_string().contains("contains no tweets"));
    }
}
