// ============================================================
// Layer 4 — Exchange Loaders
// ============================================================
// Two ExchangeSource implementations:
//
//   CornellCorpus — reads the raw Cornell movie-dialogs corpus
//   PairsFile     — reads a prepared `prompt<TAB>reply` file
//
// Cornell corpus format (ISO-8859-1, fields split by " +++$+++ "):
//
//   movie_lines.txt
//     L1045 +++$+++ u0 +++$+++ m0 +++$+++ BIANCA +++$+++ They do not!
//     lineID        characterID movieID    character    text
//
//   movie_conversations.txt
//     u0 +++$+++ u2 +++$+++ m0 +++$+++ ['L194', 'L195', 'L196']
//     character1ID  character2ID movieID   utteranceIDs
//
// Every two consecutive lines of a conversation form one exchange
// (line i is the prompt, line i+1 the reply). Exchanges where
// either side is empty after trimming are skipped.
//
// ISO-8859-1 maps each byte 1:1 onto the first 256 Unicode code
// points, so decoding is a plain byte → char conversion.
//
// Reference: Rust Book §9 (Error Handling), §12 (I/O)

use std::{
    collections::HashMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::domain::{dialogue::RawExchange, traits::ExchangeSource};

const FIELD_SEPARATOR: &str = " +++$+++ ";
const LINES_FILE: &str = "movie_lines.txt";
const CONVERSATIONS_FILE: &str = "movie_conversations.txt";

// ─── CornellCorpus ────────────────────────────────────────────────────────────
/// The raw corpus directory holding `movie_lines.txt` and
/// `movie_conversations.txt`.
pub struct CornellCorpus {
    dir: PathBuf,
}

impl CornellCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExchangeSource for CornellCorpus {
    fn load_exchanges(&self) -> Result<Vec<RawExchange>> {
        let lines_path = self.dir.join(LINES_FILE);
        let convs_path = self.dir.join(CONVERSATIONS_FILE);

        tracing::info!("Loading corpus lines from '{}'", lines_path.display());
        let lines = parse_movie_lines(&read_latin1(&lines_path)?);
        tracing::info!("Loaded {} movie lines", lines.len());

        tracing::info!("Loading conversations from '{}'", convs_path.display());
        let conversations = parse_conversations(&read_latin1(&convs_path)?);
        tracing::info!("Loaded {} conversations", conversations.len());

        let exchanges = extract_exchanges(&conversations, &lines);
        tracing::info!("Extracted {} exchanges", exchanges.len());
        Ok(exchanges)
    }
}

fn read_latin1(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}

/// Parse `movie_lines.txt` into lineID → text.
/// Lines with fewer than five fields are ignored.
pub fn parse_movie_lines(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.splitn(5, FIELD_SEPARATOR).collect();
            if fields.len() < 5 {
                return None;
            }
            Some((fields[0].trim().to_string(), fields[4].to_string()))
        })
        .collect()
}

/// Parse `movie_conversations.txt` into ordered lists of line ids.
pub fn parse_conversations(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            if fields.len() < 4 {
                return None;
            }
            Some(utterance_ids(fields[3]))
        })
        .collect()
}

/// Pull every `L<digits>` token out of a field like `['L194', 'L195']`.
fn utterance_ids(field: &str) -> Vec<String> {
    field
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|tok| {
            tok.len() > 1
                && tok.starts_with('L')
                && tok[1..].chars().all(|c| c.is_ascii_digit())
        })
        .map(str::to_string)
        .collect()
}

/// Pair up consecutive lines in every conversation.
pub fn extract_exchanges(
    conversations: &[Vec<String>],
    lines:         &HashMap<String, String>,
) -> Vec<RawExchange> {
    let mut exchanges = Vec::new();
    let mut missing   = 0usize;

    for conversation in conversations {
        for window in conversation.windows(2) {
            let (Some(prompt), Some(reply)) = (lines.get(&window[0]), lines.get(&window[1])) else {
                missing += 1;
                continue;
            };
            let prompt = prompt.trim();
            let reply  = reply.trim();
            if !prompt.is_empty() && !reply.is_empty() {
                exchanges.push(RawExchange::new(prompt, reply));
            }
        }
    }

    if missing > 0 {
        tracing::warn!("{} exchanges reference unknown line ids and were skipped", missing);
    }
    exchanges
}

// ─── PairsFile ───────────────────────────────────────────────────────────────
/// A UTF-8 file with one `prompt<TAB>reply` exchange per line.
pub struct PairsFile {
    path: PathBuf,
}

impl PairsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write exchanges, one per line. Tabs and line breaks inside a
    /// text are replaced by spaces so every line has exactly one tab.
    pub fn write(&self, exchanges: &[RawExchange]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create '{}'", parent.display()))?;
            }
        }

        let file = fs::File::create(&self.path)
            .with_context(|| format!("Cannot create '{}'", self.path.display()))?;
        let mut out = BufWriter::new(file);
        for ex in exchanges {
            writeln!(out, "{}\t{}", flatten(&ex.prompt), flatten(&ex.reply))?;
        }
        out.flush()?;

        tracing::info!("Wrote {} exchanges to '{}'", exchanges.len(), self.path.display());
        Ok(())
    }
}

fn flatten(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

/// Parse a pairs file body. Lines without exactly one tab are skipped.
pub fn parse_pairs(content: &str) -> (Vec<RawExchange>, usize) {
    let mut exchanges = Vec::new();
    let mut malformed = 0usize;

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields = line.split('\t');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(prompt), Some(reply), None) => exchanges.push(RawExchange::new(prompt, reply)),
            _ => malformed += 1,
        }
    }
    (exchanges, malformed)
}

impl ExchangeSource for PairsFile {
    fn load_exchanges(&self) -> Result<Vec<RawExchange>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read pairs file '{}'", self.path.display()))?;

        let (exchanges, malformed) = parse_pairs(&content);
        if malformed > 0 {
            tracing::warn!("Skipped {} malformed lines in '{}'", malformed, self.path.display());
        }
        tracing::info!("Read {} exchanges from '{}'", exchanges.len(), self.path.display());
        Ok(exchanges)
    }
}
