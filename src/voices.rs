//! Voice catalog and language derivation
//!
//! Voice ids are short keys such as `af_heart`. The first character encodes
//! the language family, the rest is the speaker.

use crate::error::{VoiceError, VoiceResult};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Voice used when nothing else has been configured.
pub const DEFAULT_VOICE: &str = "af_heart";

/// Language codes understood by the synthesis runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    EnUs,
    EnGb,
    Ja,
    Zh,
    Es,
    Fr,
    Hi,
    It,
    PtBr,
}

impl Language {
    /// Map a voice id prefix character to its language. Unknown prefixes
    /// fall back to American English.
    pub fn from_prefix(prefix: char) -> Self {
        match prefix {
            'a' => Language::EnUs,
            'b' => Language::EnGb,
            'j' => Language::Ja,
            'z' => Language::Zh,
            'e' => Language::Es,
            'f' => Language::Fr,
            'h' => Language::Hi,
            'i' => Language::It,
            'p' => Language::PtBr,
            _ => Language::EnUs,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::EnUs => "en-us",
            Language::EnGb => "en-gb",
            Language::Ja => "ja",
            Language::Zh => "zh",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::Hi => "hi",
            Language::It => "it",
            Language::PtBr => "pt-br",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Derive the language of a voice from the first character of its id.
pub fn language_of(id: &str) -> Language {
    id.chars()
        .next()
        .map(Language::from_prefix)
        .unwrap_or(Language::EnUs)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceDescriptor {
    pub id: String,
    pub label: String,
}

const KOKORO_VOICES: &[(&str, &str)] = &[
    // American English
    ("af_heart", "American Female - Heart (highest quality)"),
    ("af_alloy", "American Female - Alloy"),
    ("af_aoede", "American Female - Aoede"),
    ("af_bella", "American Female - Bella"),
    ("af_jessica", "American Female - Jessica"),
    ("af_kore", "American Female - Kore"),
    ("af_nicole", "American Female - Nicole"),
    ("af_nova", "American Female - Nova"),
    ("af_river", "American Female - River"),
    ("af_sarah", "American Female - Sarah"),
    ("af_sky", "American Female - Sky"),
    ("am_adam", "American Male - Adam"),
    ("am_echo", "American Male - Echo"),
    ("am_eric", "American Male - Eric"),
    ("am_fenrir", "American Male - Fenrir"),
    ("am_liam", "American Male - Liam"),
    ("am_michael", "American Male - Michael"),
    ("am_onyx", "American Male - Onyx"),
    ("am_puck", "American Male - Puck"),
    ("am_santa", "American Male - Santa"),
    // British English
    ("bf_alice", "British Female - Alice"),
    ("bf_emma", "British Female - Emma"),
    ("bf_isabella", "British Female - Isabella"),
    ("bf_lily", "British Female - Lily"),
    ("bm_daniel", "British Male - Daniel"),
    ("bm_fable", "British Male - Fable"),
    ("bm_george", "British Male - George"),
    ("bm_lewis", "British Male - Lewis"),
];

/// Ordered, read-only set of voices. Insertion order is display order.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: Vec<VoiceDescriptor>,
}

impl VoiceCatalog {
    /// Build a catalog from `(id, label)` pairs, rejecting duplicate ids.
    pub fn new<I, K, L>(entries: I) -> VoiceResult<Self>
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut voices = Vec::new();
        for (id, label) in entries {
            let id = id.into();
            if !seen.insert(id.clone()) {
                return Err(VoiceError::Config(format!("duplicate voice id '{}'", id)));
            }
            voices.push(VoiceDescriptor {
                id,
                label: label.into(),
            });
        }
        Ok(Self { voices })
    }

    /// The built-in Kokoro English voices.
    pub fn kokoro() -> Self {
        Self {
            voices: KOKORO_VOICES
                .iter()
                .map(|(id, label)| VoiceDescriptor {
                    id: (*id).to_string(),
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&VoiceDescriptor> {
        self.voices.iter().find(|v| v.id == id)
    }

    pub fn label_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|v| v.label.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceDescriptor> {
        self.voices.iter()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Select voices by language filter, keeping catalog order.
    ///
    /// `"all"` matches everything, `"en"` matches American and British voices,
    /// any other token is an id prefix.
    pub fn filter(&self, token: &str) -> Vec<&VoiceDescriptor> {
        self.voices
            .iter()
            .filter(|v| match token {
                "all" => true,
                "en" => v.id.starts_with('a') || v.id.starts_with('b'),
                prefix => v.id.starts_with(prefix),
            })
            .collect()
    }

    pub fn sorted_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.voices.iter().map(|v| v.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::kokoro()
    }
}
