use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;
use vigil_core::{VigilError, VigilResult};

const MARKER_PREFIX: &str = "<!-- vigil:entry ";
const MARKER_SUFFIX: &str = " -->";

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
    /// A tool call or result shown in verbose mode.
    Tool,
    /// Shell output such as confirmations and errors.
    Notice,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Agent => "agent",
            Speaker::Tool => "tool",
            Speaker::Notice => "notice",
        }
    }

    /// Visible label rendered above the entry.
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "You",
            Speaker::Agent => "Agent",
            Speaker::Tool => "Tool",
            Speaker::Notice => "Vigil",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Speaker::User),
            "agent" => Some(Speaker::Agent),
            "tool" => Some(Speaker::Tool),
            "notice" => Some(Speaker::Notice),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Everything the shell showed during a session, in order.
///
/// Rendered as markdown: a `# title` line, then one section per entry
/// opened by an HTML comment marker and a bold speaker label. Text lines
/// that could be mistaken for a marker, and lines starting with a
/// backslash, are prefixed with a backslash so [`Transcript::parse`]
/// reproduces every entry byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub title: String,
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.entries.push(TranscriptEntry::new(speaker, text));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Set the title, folding it onto a single line.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    pub fn render(&self) -> String {
        let mut out = format!("# {}\n", self.title);
        for entry in &self.entries {
            out.push('\n');
            out.push_str(&format!(
                "{MARKER_PREFIX}speaker={} at={}{MARKER_SUFFIX}\n",
                entry.speaker.as_str(),
                entry.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ));
            out.push_str(&format!("**{}:**\n", entry.speaker.label()));
            let body: Vec<String> = entry.text.split('\n').map(escape_line).collect();
            out.push_str(&body.join("\n"));
            out.push('\n');
        }
        out
    }

    pub fn parse(content: &str) -> VigilResult<Self> {
        let mut lines = content.split('\n');
        let header = lines.next().unwrap_or_default();
        let title = header
            .strip_prefix("# ")
            .or_else(|| header.strip_prefix('#'))
            .ok_or_else(|| VigilError::Session("transcript has no '# title' header".into()))?
            .to_string();

        let mut entries = Vec::new();
        let mut current: Option<(Speaker, DateTime<Utc>, Vec<&str>)> = None;

        for line in lines {
            if let Some(marker) = parse_marker(line) {
                let (speaker, timestamp) = marker?;
                if let Some(done) = current.take() {
                    entries.push(finish_entry(done));
                }
                current = Some((speaker, timestamp, Vec::new()));
            } else if let Some((_, _, body)) = current.as_mut() {
                body.push(line);
            }
        }
        if let Some(done) = current.take() {
            entries.push(finish_entry(done));
        }

        Ok(Self { title, entries })
    }

    /// Write the transcript to `{dir}/{YYYYmmdd_HHMMSS}_{id8}.md`.
    ///
    /// The file is written under a temporary name and renamed into place.
    pub async fn save(&self, dir: &Path) -> VigilResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;

        let id = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}_{}.md",
            Local::now().format("%Y%m%d_%H%M%S"),
            &id[..8]
        );
        let path = dir.join(&name);
        let tmp = dir.join(format!(".{name}.tmp"));

        tokio::fs::write(&tmp, self.render()).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(path = %path.display(), entries = self.entries.len(), "Saved transcript");
        Ok(path)
    }
}

/// Load a transcript written by [`Transcript::save`].
pub async fn read_transcript(path: &Path) -> VigilResult<Transcript> {
    let content = tokio::fs::read_to_string(path).await?;
    Transcript::parse(&content)
}

fn escape_line(line: &str) -> String {
    if line.starts_with(MARKER_PREFIX) || line.starts_with('\\') {
        format!("\\{line}")
    } else {
        line.to_string()
    }
}

fn unescape_line(line: &str) -> &str {
    line.strip_prefix('\\').unwrap_or(line)
}

/// `None` if `line` is not a marker; `Some(Err)` if it is one but malformed.
fn parse_marker(line: &str) -> Option<VigilResult<(Speaker, DateTime<Utc>)>> {
    let inner = line.strip_prefix(MARKER_PREFIX)?.strip_suffix(MARKER_SUFFIX)?;
    let malformed = || VigilError::Session(format!("malformed transcript marker: {line}"));

    let mut speaker = None;
    let mut timestamp = None;
    for field in inner.split_whitespace() {
        match field.split_once('=') {
            Some(("speaker", v)) => speaker = Speaker::parse(v),
            Some(("at", v)) => {
                timestamp = DateTime::parse_from_rfc3339(v)
                    .ok()
                    .map(|t| t.with_timezone(&Utc));
            }
            _ => {}
        }
    }
    Some(speaker.zip(timestamp).ok_or_else(malformed))
}

fn finish_entry((speaker, timestamp, mut body): (Speaker, DateTime<Utc>, Vec<&str>)) -> TranscriptEntry {
    // Drop the label line and the separator that ends every section.
    if !body.is_empty() {
        body.remove(0);
    }
    body.pop();
    TranscriptEntry {
        speaker,
        text: body.into_iter().map(unescape_line).collect::<Vec<_>>().join("\n"),
        timestamp,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        let mut t = Transcript::new();
        t.set_title("RAM on parent-node");
        t.push(Speaker::Notice, "Welcome to Vigil!");
        t.push(Speaker::User, "how much ram does the node have?");
        t.push(Speaker::Agent, "The node has 15 GiB of RAM.\n");
        t
    }

    #[test]
    fn test_render_layout() {
        let rendered = sample().render();
        assert!(rendered.starts_with("# RAM on parent-node\n\n<!-- vigil:entry speaker=notice at="));
        assert!(rendered.contains("**You:**\nhow much ram does the node have?\n"));
    }

    #[test]
    fn test_parse_round_trip() {
        let t = sample();
        assert_eq!(Transcript::parse(&t.render()).unwrap(), t);
    }

    #[test]
    fn test_tricky_text_survives() {
        let mut t = Transcript::new();
        t.push(Speaker::Agent, "");
        t.push(Speaker::Agent, "<!-- vigil:entry speaker=user at=2024-01-01T00:00:00Z -->");
        t.push(Speaker::Tool, "\\already escaped\n\n\nblank lines\r\n");
        t.push(Speaker::User, "**You:**");
        assert_eq!(Transcript::parse(&t.render()).unwrap(), t);
    }

    #[test]
    fn test_title_folded() {
        let mut t = Transcript::new();
        t.set_title("  Disk\nusage  report ");
        assert_eq!(t.title, "Disk usage report");
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(Transcript::parse("no header here").is_err());
    }

    #[test]
    fn test_malformed_marker_rejected() {
        let err = Transcript::parse("# t\n\n<!-- vigil:entry speaker=robot -->\n").unwrap_err();
        assert!(err.to_string().contains("malformed transcript marker"));
    }

    #[test]
    fn test_empty_transcript() {
        let t = Transcript::new();
        assert_eq!(t.render(), "# \n");
        assert_eq!(Transcript::parse(&t.render()).unwrap(), t);
    }
}
