// Session persistence (last search, language) and "/<lang>/<search>" deep links
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::nta_models::{Lang, NTAError, Result};

lazy_static! {
    static ref FRAGMENT: Regex =
        Regex::new(r"^#?/(?P<lang>[A-Za-z]{2})/(?P<search>.*)$").expect("fragment pattern");
    static ref DISALLOWED: Regex =
        Regex::new(r"[^\p{Hangul}A-Za-z0-9 .()\-]").expect("allowed character pattern");
}

/// Strips every character outside the allowed set.
pub fn sanitize_search(text: &str) -> String {
    DISALLOWED.replace_all(text, "").into_owned()
}

/// `"#/en/City Hall"` or `"/ko/시청"` -> language and sanitized search text.
pub fn parse_fragment(fragment: &str) -> Option<(Lang, String)> {
    let captures = FRAGMENT.captures(fragment.trim())?;
    let lang: Lang = captures["lang"].parse().ok()?;
    Some((lang, sanitize_search(&captures["search"])))
}

pub fn to_fragment(lang: Lang, search: &str) -> String {
    format!("#/{}/{}", lang.code(), sanitize_search(search))
}

/// What the view starts with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub lang: Lang,
    pub search: String,
}

// ============================================================================
// Key-value storage
// ============================================================================

/// Small JSON key-value file holding the persisted session keys.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SessionStore {
    pub const SEARCH_KEY: &'static str = "nta.search";
    pub const LANG_KEY: &'static str = "nta.lang";

    /// Opens the store; a missing or unreadable file starts it empty.
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Ignoring corrupt session file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Could not read session file {:?}: {}", path, e);
                BTreeMap::new()
            }
        };

        SessionStore {
            path: path.to_path_buf(),
            values,
        }
    }

    pub fn search(&self) -> Option<&str> {
        self.values.get(Self::SEARCH_KEY).map(String::as_str)
    }

    pub fn lang(&self) -> Option<Lang> {
        self.values.get(Self::LANG_KEY)?.parse().ok()
    }

    pub fn set_search(&mut self, text: &str) {
        self.values
            .insert(Self::SEARCH_KEY.to_string(), sanitize_search(text));
    }

    pub fn set_lang(&mut self, lang: Lang) {
        self.values
            .insert(Self::LANG_KEY.to_string(), lang.code().to_string());
    }

    /// Persisted values, overridden as a whole by a matching deep link.
    pub fn restore(&self, fragment: Option<&str>) -> Session {
        if let Some((lang, search)) = fragment.and_then(parse_fragment) {
            return Session { lang, search };
        }
        Session {
            lang: self.lang().unwrap_or_default(),
            search: self.search().unwrap_or_default().to_string(),
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| NTAError::FileError(format!("Failed to create {:?}: {}", dir, e)))?;
        }

        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| NTAError::FileError(format!("Failed to serialize session: {}", e)))?;

        fs::write(&self.path, json)
            .map_err(|e| NTAError::FileError(format!("Failed to write session: {}", e)))?;

        info!("Session saved to {:?}", self.path);
        Ok(())
    }
}
