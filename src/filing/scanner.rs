//! Tag scanner for the SEC nested-tag submission format
//!
//! 13F-HR submissions are SGML-flavored documents with an embedded XML
//! information table. Producers vary tag casing, close some tags and not
//! others, and frequently prefix every tag with a vendor namespace token
//! (`ns1:` and friends). The scanner normalizes all of that into a flat
//! tag index with one lookup path: names are lowercased and any namespace
//! prefix is stripped before matching.

/// A single tag occurrence inside the document text.
#[derive(Debug, Clone)]
struct Tag {
    /// Normalized name: lowercase, namespace prefix stripped.
    name: String,
    /// True for `</...>` closing tags.
    closing: bool,
    /// Byte offset of the character following the tag's `>`.
    content_start: usize,
}

/// Indexed view over one submission document.
///
/// Content lookups mirror how a tolerant markup parser behaves on this
/// format: the text of a tag runs from its `>` to the next `<`, so both
/// `<cik>123</cik>` and the unclosed header style `<TYPE>13F-HR` resolve
/// the same way.
#[derive(Debug, Clone)]
pub struct TagDocument<'a> {
    text: &'a str,
    tags: Vec<Tag>,
}

/// Lowercase a raw tag name and drop any `prefix:` namespace token.
fn normalize_name(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    match lower.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => lower,
    }
}

impl<'a> TagDocument<'a> {
    /// Scan the document text and build the tag index.
    pub fn parse(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let mut tags = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'<' {
                i += 1;
                continue;
            }
            i += 1;
            let closing = i < bytes.len() && bytes[i] == b'/';
            if closing {
                i += 1;
            }
            let name_start = i;
            // Tag name runs to whitespace (attributes) or the closing '>'.
            while i < bytes.len() && bytes[i] != b'>' && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let raw_name = &text[name_start..i];
            // Skip the remainder of the tag (attributes, if any).
            while i < bytes.len() && bytes[i] != b'>' {
                i += 1;
            }
            if i < bytes.len() {
                i += 1; // consume '>'
            }
            if raw_name.is_empty() || raw_name.starts_with('?') || raw_name.starts_with('!') {
                // XML declarations, comments, doctypes.
                continue;
            }
            tags.push(Tag {
                name: normalize_name(raw_name),
                closing,
                content_start: i,
            });
        }

        TagDocument { text, tags }
    }

    /// Text content of the first occurrence of `name`: everything from the
    /// tag's `>` up to the next `<`, trimmed. Returns `None` if the tag is
    /// absent.
    pub fn text_of(&self, name: &str) -> Option<&'a str> {
        let tag = self.tags.iter().find(|t| !t.closing && t.name == name)?;
        let rest = &self.text[tag.content_start..];
        let end = rest.find('<').unwrap_or(rest.len());
        Some(rest[..end].trim())
    }

    /// Sub-document spanning the first `<name>`..`</name>` block.
    pub fn block(&self, name: &str) -> Option<TagDocument<'a>> {
        self.blocks(name).into_iter().next()
    }

    /// All `<name>`..`</name>` blocks, in document order. Blocks of the
    /// same name are assumed not to nest, which holds for this format.
    pub fn blocks(&self, name: &str) -> Vec<TagDocument<'a>> {
        let mut found = Vec::new();
        let mut open: Option<usize> = None;

        for (idx, tag) in self.tags.iter().enumerate() {
            if tag.name != name {
                continue;
            }
            match (tag.closing, open) {
                (false, None) => open = Some(idx),
                (true, Some(start)) => {
                    let inner = self.tags[start + 1..idx].to_vec();
                    found.push(TagDocument {
                        text: self.text,
                        tags: inner,
                    });
                    open = None;
                }
                // Stray closer or a reopen before a close; keep scanning.
                _ => {}
            }
        }

        // An opened block that never closes still yields its tail, so a
        // truncated trailing entry is visible rather than dropped.
        if let Some(start) = open {
            found.push(TagDocument {
                text: self.text,
                tags: self.tags[start + 1..].to_vec(),
            });
        }

        found
    }

    /// Whether the document contains an opening tag with this name.
    pub fn has(&self, name: &str) -> bool {
        self.tags.iter().any(|t| !t.closing && t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_text_case_insensitively() {
        let doc = TagDocument::parse("<CIK>0001234567</CIK>");
        assert_eq!(doc.text_of("cik"), Some("0001234567"));
    }

    #[test]
    fn strips_namespace_prefix() {
        let doc = TagDocument::parse("<ns1:periodOfReport>03-31-2020</ns1:periodOfReport>");
        assert_eq!(doc.text_of("periodofreport"), Some("03-31-2020"));
    }

    #[test]
    fn unclosed_header_tag_reads_to_next_tag() {
        let doc = TagDocument::parse("<TYPE>13F-HR\n<SEQUENCE>1\n");
        assert_eq!(doc.text_of("type"), Some("13F-HR"));
        assert_eq!(doc.text_of("sequence"), Some("1"));
    }

    #[test]
    fn blocks_isolate_repeated_entries() {
        let text = "<infoTable><cusip>A</cusip></infoTable>\
                    <infoTable><cusip>B</cusip></infoTable>";
        let doc = TagDocument::parse(text);
        let blocks = doc.blocks("infotable");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text_of("cusip"), Some("A"));
        assert_eq!(blocks[1].text_of("cusip"), Some("B"));
    }

    #[test]
    fn nested_block_lookup() {
        let text = "<filingManager><name>ACME LLC</name></filingManager>";
        let doc = TagDocument::parse(text);
        let manager = doc.block("filingmanager").unwrap();
        assert_eq!(manager.text_of("name"), Some("ACME LLC"));
    }

    #[test]
    fn missing_tag_is_none() {
        let doc = TagDocument::parse("<a>1</a>");
        assert_eq!(doc.text_of("b"), None);
        assert!(!doc.has("b"));
        assert!(doc.has("a"));
    }
}
