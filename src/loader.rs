//! Per-format document loaders.
//!
//! A [`LoaderRegistry`] maps lower-cased file extensions to a
//! [`DocumentLoader`]. Loaders turn file bytes into plain UTF-8 text; they
//! never panic, and a failure is reported as
//! [`Error::Loader`](unibot_core::Error::Loader) so the corpus walk can skip
//! the file and continue.
//!
//! | Extension | Loader |
//! |-----------|--------|
//! | `txt`, `text` | [`TextLoader`] |
//! | `md`, `markdown` | [`MarkdownLoader`] |
//! | `pdf` | [`PdfLoader`] (`pdf-extract`) |
//! | `docx` | [`DocxLoader`] (`zip` + `quick-xml`) |

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use unibot_core::{Error, Result};

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Turns the bytes of one file into text.
pub trait DocumentLoader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower-case extensions this loader handles, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Extract text. The error string becomes the `reason` of
    /// [`Error::Loader`].
    fn extract(&self, bytes: &[u8]) -> std::result::Result<String, String>;
}

pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["txt", "text"]
    }

    fn extract(&self, bytes: &[u8]) -> std::result::Result<String, String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| format!("not valid UTF-8: {}", e))
    }
}

/// Markdown is indexed as written; the syntax carries little noise for
/// embedding models.
pub struct MarkdownLoader;

impl DocumentLoader for MarkdownLoader {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["md", "markdown"]
    }

    fn extract(&self, bytes: &[u8]) -> std::result::Result<String, String> {
        TextLoader.extract(bytes)
    }
}

pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }

    fn extract(&self, bytes: &[u8]) -> std::result::Result<String, String> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| format!("PDF extraction failed: {}", e))
    }
}

/// Reads `word/document.xml`; each `w:p` paragraph becomes one line.
pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["docx"]
    }

    fn extract(&self, bytes: &[u8]) -> std::result::Result<String, String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| format!("DOCX is not a valid archive: {}", e))?;
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| "word/document.xml not found".to_string())?;
        let mut xml = Vec::new();
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut xml)
            .map_err(|e| e.to_string())?;
        if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err("word/document.xml exceeds size limit".to_string());
        }
        docx_paragraphs(&xml)
    }
}

fn docx_paragraphs(xml: &[u8]) -> std::result::Result<String, String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"tab" => out.push('\t'),
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed document.xml: {}", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Extension → loader lookup.
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register `loader` for every extension it declares, replacing any
    /// loader previously registered for the same extension.
    pub fn register(&mut self, loader: Arc<dyn DocumentLoader>) {
        for ext in loader.extensions() {
            self.loaders.insert(ext.to_string(), loader.clone());
        }
    }

    pub fn loader_for(&self, path: &Path) -> Option<&Arc<dyn DocumentLoader>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.loaders.get(&ext)
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.loader_for(path).is_some()
    }

    /// Load `bytes` read from `path`, reporting failures against `source_id`.
    pub fn load(&self, source_id: &str, path: &Path, bytes: &[u8]) -> Result<String> {
        let loader = self.loader_for(path).ok_or_else(|| Error::Loader {
            path: source_id.to_string(),
            reason: "no loader registered for this file type".to_string(),
        })?;
        loader.extract(bytes).map_err(|reason| Error::Loader {
            path: source_id.to_string(),
            reason,
        })
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(TextLoader));
        registry.register(Arc::new(MarkdownLoader));
        registry.register(Arc::new(PdfLoader));
        registry.register(Arc::new(DocxLoader));
        registry
    }
}
