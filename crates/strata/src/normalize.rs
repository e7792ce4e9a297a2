//! Text normalization applied before embedding
//!
//! Folds the spelling variants that make otherwise identical Arabic titles
//! embed apart: diacritics, Alef forms, Alef Maksura, and separator
//! characters used in filenames.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use strata_core::{Chunk, Document};

/// Tashkeel marks and the superscript Alef
static DIACRITICS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{064B}-\u{0652}\u{0670}]").expect("valid diacritics pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    let stripped = DIACRITICS.replace_all(&composed, "");
    let folded: String = stripped
        .chars()
        .map(|c| match c {
            'أ' | 'إ' | 'آ' => 'ا',
            'ى' => 'ي',
            '_' | '-' => ' ',
            other => other,
        })
        .collect();
    WHITESPACE.replace_all(&folded, " ").trim().to_string()
}

pub fn normalize_chunk(chunk: &Chunk) -> Chunk {
    Chunk {
        chunk_id: chunk.chunk_id,
        title: normalize_text(&chunk.title),
        content: normalize_text(&chunk.content),
    }
}

/// Normalize filename, titles and contents; the external link is kept as is
pub fn normalize_document(document: &Document) -> Document {
    Document {
        id: document.id,
        filename: normalize_text(&document.filename),
        external_link: document.external_link.clone(),
        chunks: document.chunks.iter().map(normalize_chunk).collect(),
    }
}
