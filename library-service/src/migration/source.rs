use std::{collections::BTreeMap, fs, path::Path};

use super::MigrationError;

const UP_SUFFIX: &str = ".up.sql";

/// A forward migration read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub title: String,
    pub sql: String,
}

/// Reads every `<version>_<title>.up.sql` file in `dir`, ordered by version.
///
/// Other files are skipped.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, a file name has no
/// numeric version, or two files share a version.
pub fn load_migrations(dir: &Path) -> Result<Vec<Migration>, MigrationError> {
    let mut migrations = BTreeMap::new();

    let entries = fs::read_dir(dir).map_err(|source| MigrationError::Source {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| MigrationError::Source {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(stem) = file_name.strip_suffix(UP_SUFFIX) else {
            continue;
        };
        if !path.is_file() {
            continue;
        }

        let (version, title) = parse_stem(stem).ok_or_else(|| MigrationError::InvalidName {
            name: file_name.to_string(),
        })?;
        if migrations.contains_key(&version) {
            return Err(MigrationError::DuplicateVersion { version });
        }

        let sql = fs::read_to_string(&path).map_err(|source| MigrationError::Source {
            path: path.clone(),
            source,
        })?;
        migrations.insert(
            version,
            Migration {
                version,
                title: title.to_string(),
                sql,
            },
        );
    }

    Ok(migrations.into_values().collect())
}

fn parse_stem(stem: &str) -> Option<(i64, &str)> {
    let (version, title) = stem.split_once('_').unwrap_or((stem, ""));
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((version.parse().ok()?, title))
}
