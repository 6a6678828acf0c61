//! Line-shape repair for generated documents.
//!
//! Generated text is expected to consist of `# heading` and `- bullet` lines. The service
//! routinely deviates: it overshoots heading depth, uses `*` bullets, drops the `#` from
//! numbered chapter titles, and prepends chatter. [`Grammar::repair`] fixes all of that in one
//! pass and, for grammars with required headings, appends a placeholder block for every
//! heading that never showed up. Repair never fails and is idempotent.
//!
//! Headings that canonicalize to the same name are left as separate blocks; nothing merges
//! their bullets.

/// Section headings every critique must carry, in output order.
pub const CRITIQUE_HEADINGS: [&str; 4] = [
    "新規性",
    "言及されている全ての関連研究との相違点",
    "有効性",
    "信頼性",
];

/// Bullet appended under a required heading that was missing from the output.
pub const MISSING_SECTION_BULLET: &str = "- (no information)";

/// Structural contract a final output must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    required_headings: Vec<String>,
}

impl Grammar {
    /// Chapter summary: no fixed headings; numbered lines are recovered as headings.
    pub fn summary() -> Self {
        Self {
            required_headings: Vec::new(),
        }
    }

    /// Peer-review critique: the four [`CRITIQUE_HEADINGS`].
    pub fn critique() -> Self {
        Self::with_required_headings(CRITIQUE_HEADINGS)
    }

    /// Grammar requiring each of `headings` at least once.
    pub fn with_required_headings<I, S>(headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_headings: headings.into_iter().map(Into::into).collect(),
        }
    }

    /// Required canonical heading names.
    pub fn required_headings(&self) -> &[String] {
        &self.required_headings
    }

    /// Map heading text to the first required heading it contains.
    pub fn canonicalize(&self, heading_text: &str) -> Option<&str> {
        self.canonical_position(heading_text)
            .map(|position| self.required_headings[position].as_str())
    }

    fn canonical_position(&self, heading_text: &str) -> Option<usize> {
        self.required_headings
            .iter()
            .position(|name| heading_text.contains(name.as_str()))
    }

    /// Repair `text` so every non-blank line is a heading or a bullet.
    pub fn repair(&self, text: &str) -> String {
        let mut found = vec![false; self.required_headings.len()];
        let mut lines: Vec<String> = Vec::new();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                lines.push(String::new());
                continue;
            }

            let mut line = match line.strip_prefix("## ") {
                Some(rest) => format!("# {rest}"),
                None => line.to_string(),
            };

            if !self.required_headings.is_empty() {
                if let Some(rest) = line.strip_prefix("# ") {
                    if let Some(position) = self.canonical_position(rest) {
                        found[position] = true;
                        line = format!("# {}", self.required_headings[position]);
                    }
                }
            }

            if let Some(rest) = line.strip_prefix("* ") {
                line = format!("- {rest}");
            }

            if line.starts_with('#') || line.starts_with('-') {
                lines.push(line);
            } else if self.required_headings.is_empty()
                && line.chars().next().is_some_and(char::is_numeric)
            {
                lines.push(format!("# {line}"));
            }
            // Anything else (preamble, `**emphasis**` paragraphs) is dropped.
        }

        for (name, present) in self.required_headings.iter().zip(&found) {
            if !present {
                lines.push(format!("# {name}"));
                lines.push(MISSING_SECTION_BULLET.to_string());
            }
        }

        lines.join("\n").trim().to_string()
    }
}
