use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::primitives::language::Language;
use crate::primitives::position::char_len;

static NEXT_FILE_ID: AtomicUsize = AtomicUsize::new(1);
static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Generate a process-unique virtual file id (`index-<n>.tsx`)
pub fn generate_file_id() -> String {
    format!("index-{}.tsx", NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Identity of one content version of one buffer.
///
/// Versions only order registrations of the same owner; every buffer gets a
/// process-unique owner, so a buffer reusing another buffer's file id starts
/// over instead of looking stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub owner: u64,
    pub version: u64,
}

impl Revision {
    /// Revision of content that belongs to no buffer (ambient declarations)
    pub const AMBIENT: Revision = Revision { owner: 0, version: 0 };
}

/// Text being edited, with its language and virtual file identity.
///
/// Every mutation bumps `version`; derived state computed for an older
/// version is stale.
#[derive(Debug, Clone)]
pub struct Buffer {
    text: String,
    language: Language,
    /// Language id given by the caller, if any (otherwise detected from the file id)
    language_id: Option<String>,
    file_id: String,
    owner: u64,
    version: u64,
}

impl Buffer {
    pub fn new(text: impl Into<String>, language: Option<&str>, filename: Option<&str>) -> Self {
        let file_id = match filename.filter(|f| !f.is_empty()) {
            Some(f) => f.to_string(),
            None => generate_file_id(),
        };
        let language_id = language.map(str::to_string);
        Self {
            text: text.into(),
            language: Language::resolve(language_id.as_deref(), &file_id),
            language_id,
            file_id,
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            version: 1,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn revision(&self) -> Revision {
        Revision {
            owner: self.owner,
            version: self.version,
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the whole content. Returns false (and keeps the version) when
    /// the text is unchanged.
    pub fn replace(&mut self, text: String) -> bool {
        if text == self.text {
            return false;
        }
        self.text = text;
        self.version += 1;
        true
    }

    /// Switch to a new virtual file id (auto-generated when `None`)
    pub fn set_file_id(&mut self, filename: Option<&str>) {
        self.file_id = match filename.filter(|f| !f.is_empty()) {
            Some(f) => f.to_string(),
            None => generate_file_id(),
        };
        self.language = Language::resolve(self.language_id.as_deref(), &self.file_id);
        self.version += 1;
    }

    pub fn set_language(&mut self, language: Option<&str>) {
        self.language_id = language.map(str::to_string);
        self.language = Language::resolve(self.language_id.as_deref(), &self.file_id);
        self.version += 1;
    }
}
