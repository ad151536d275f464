use scraper::ElementRef;

pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

/// Collapses every run of whitespace (including `\u{a0}`) to one space and trims.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans scraped text fragments.
///
/// Nested markup repeats content (the teacher name sits inside the subject
/// title) and carries layout whitespace; both are removed here.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    strip: Vec<String>,
}

impl TextNormalizer {
    pub fn new<I, S>(strip: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let strip = strip
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { strip }
    }

    pub fn normalize(&self, raw: &str) -> String {
        // Repeat until stable: removing one substring may join text into another.
        let mut current = self.single_pass(raw);
        loop {
            let next = self.single_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn single_pass(&self, text: &str) -> String {
        let mut text = text.to_string();
        for s in &self.strip {
            text = text.replace(s.as_str(), " ");
        }
        collapse_whitespace(&text)
    }
}
