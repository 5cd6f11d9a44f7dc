// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::database;
use crate::errors::{GraderError, Result};
use crate::quiz::QuizDefinition;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_PYTHON: &str = "python3";

/// High-level application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server listens on.
    pub bind: String,
    /// Interpreter used for code exercises.
    pub python: String,
    /// Optional TOML file with exercise and quiz definitions.
    pub catalog_path: Option<PathBuf>,
    /// SQLite file backing the key/value store.
    pub storage_path: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = non_empty("GRADER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let python = non_empty("GRADER_PYTHON").unwrap_or_else(|| DEFAULT_PYTHON.to_string());
        let catalog_path = non_empty("GRADER_CATALOG").map(PathBuf::from);

        let storage_path = match non_empty("DATABASE_URL") {
            Some(url) => database::path_from_url(&url).ok_or_else(|| {
                GraderError::Config(format!(
                    "DATABASE_URL must look like 'sqlite:<path>', got '{}'",
                    url
                ))
            })?,
            None => default_storage_path()?,
        };

        Ok(AppConfig {
            bind,
            python,
            catalog_path,
            storage_path,
        })
    }
}

fn default_storage_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        GraderError::Config("No data directory found; set DATABASE_URL".to_string())
    })?;
    Ok(data_dir.join("exercise-grader").join("storage.db"))
}

/// A code exercise: learners start from `starter_code` and their edits are
/// stored under the exercise name.
#[derive(Deserialize, Debug, Clone)]
pub struct ExerciseConfig {
    pub name: String,
    pub starter_code: String,
}

/// Every exercise and quiz the server knows about.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Catalog {
    #[serde(default)]
    pub exercises: Vec<ExerciseConfig>,
    #[serde(default)]
    pub quizzes: Vec<QuizDefinition>,
}

const BUILTIN_CATALOG: &str = r#"
[[exercises]]
name = "lesser-num"
starter_code = '''
def lesser_num(num1, num2):
    """ Returns whichever number is lowest of the two supplied numbers.

    >>> lesser_num(45, 10)
    10
    >>> lesser_num(-1, 30)
    -1
    >>> lesser_num(20, 20)
    20
    """
    # YOUR CODE HERE'''
"#;

impl Catalog {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(text)?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The demo catalog used when no file is configured.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn exercise(&self, name: &str) -> Option<&ExerciseConfig> {
        self.exercises.iter().find(|e| e.name == name)
    }

    pub fn quiz(&self, name: &str) -> Option<&QuizDefinition> {
        self.quizzes.iter().find(|q| q.name.as_deref() == Some(name))
    }

    fn check(&self) -> Result<()> {
        for (idx, exercise) in self.exercises.iter().enumerate() {
            if self.exercises[..idx].iter().any(|e| e.name == exercise.name) {
                return Err(GraderError::Config(format!(
                    "Duplicate exercise name '{}'",
                    exercise.name
                )));
            }
        }
        for quiz in &self.quizzes {
            quiz.check()?;
        }
        Ok(())
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
    fn test_app_config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite:data/app.db")])).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.python, "python3");
        assert_eq!(config.catalog_path, None);
        assert_eq!(config.storage_path, PathBuf::from("data/app.db"));
    }

    #[test]
    fn test_app_config_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GRADER_BIND", "127.0.0.1:9000"),
            ("GRADER_PYTHON", "/usr/bin/python3.12"),
            ("GRADER_CATALOG", "catalog.toml"),
            ("DATABASE_URL", "sqlite:///var/lib/grader.db"),
        ]))
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.python, "/usr/bin/python3.12");
        assert_eq!(config.catalog_path, Some(PathBuf::from("catalog.toml")));
        assert_eq!(config.storage_path, PathBuf::from("/var/lib/grader.db"));
    }

    #[test]
    fn test_app_config_rejects_foreign_database() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")])).unwrap_err();
        assert!(matches!(err, GraderError::Config(_)));
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        let exercise = catalog.exercise("lesser-num").unwrap();
        assert!(exercise.starter_code.starts_with("def lesser_num(num1, num2):"));
        assert!(exercise.starter_code.contains(">>> lesser_num(45, 10)"));
        assert!(catalog.exercise("missing").is_none());
    }

    #[test]
    fn test_duplicate_exercise_rejected() {
        let text = r#"
[[exercises]]
name = "a"
starter_code = "def a():\n    pass"

[[exercises]]
name = "a"
starter_code = "def b():\n    pass"
"#;
        assert!(matches!(
            Catalog::from_toml_str(text),
            Err(GraderError::Config(_))
        ));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            Catalog::from_toml_str("[[exercises]\nname="),
            Err(GraderError::TomlParse(_))
        ));
    }
}
