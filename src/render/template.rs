//! Document templates.
//!
//! A template is literal text with `%ssr.<name>%` placeholders. It renders
//! either synchronously from resolved strings or as an ordered stream from
//! pending slot futures (see [`crate::render::stream`]).

use futures_util::future::FutureExt;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::http::response::BodyStream;
use crate::render::stream::{Sequencer, SlotFuture};

const OPEN: &str = "%ssr.";
const CLOSE: char = '%';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

/// A parsed document template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut rest = source;

        while let Some(start) = rest.find(OPEN) {
            let after = &rest[start + OPEN.len()..];
            match after.find(CLOSE) {
                Some(end) if valid_name(&after[..end]) => {
                    text.push_str(&rest[..start]);
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Slot(after[..end].to_string()));
                    rest = &after[end + CLOSE.len_utf8()..];
                }
                _ => {
                    text.push_str(&rest[..start + OPEN.len()]);
                    rest = after;
                }
            }
        }
        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self { segments }
    }

    /// Slot names in the order they appear.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Substitute resolved values. Slots with no value render empty.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => {
                    if let Some((_, value)) = values.iter().find(|(key, _)| *key == name.as_str()) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }

    /// Stream the document: text is available immediately, each slot is
    /// written once it and every slot before it have resolved.
    pub fn stream(&self, slots: HashMap<String, SlotFuture>) -> BodyStream {
        let slots: HashMap<_, _> = slots
            .into_iter()
            .map(|(name, future)| (name, future.shared()))
            .collect();

        let mut sequencer = Sequencer::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sequencer.push_text(text.clone()),
                Segment::Slot(name) => match slots.get(name) {
                    Some(future) => sequencer.push_slot(future.clone().boxed()),
                    None => sequencer.push_text(String::new()),
                },
            }
        }
        sequencer.into_stream()
    }
}

pub const MAIN_TEMPLATE: &str = "\
<!doctype html>
<html>
<head>
\t<meta charset='utf-8'>
\t<meta name='viewport' content='width=device-width'>
\t%ssr.head%
\t%ssr.styles%
</head>
<body>
\t<div id='app'>%ssr.html%</div>
\t%ssr.scripts%
</body>
</html>
";

pub const NOT_FOUND_TEMPLATE: &str = "\
<!doctype html>
<html>
<head>
\t<meta charset='utf-8'>
\t<title>%ssr.title%</title>
</head>
<body>
\t<h1>Not found</h1>
\t<p>Cannot %ssr.method% %ssr.url%</p>
\t%ssr.scripts%
</body>
</html>
";

pub const ERROR_TEMPLATE: &str = "\
<!doctype html>
<html>
<head>
\t<meta charset='utf-8'>
\t<title>%ssr.title%</title>
</head>
<body>
\t<h1>%ssr.title%</h1>
\t<p>%ssr.url%</p>
\t<p>%ssr.error%</p>
\t<pre>%ssr.stack%</pre>
</body>
</html>
";

/// The named document set used by the gateway.
#[derive(Debug, Clone)]
pub struct Templates {
    /// Page documents (`head`, `styles`, `html`, `scripts`).
    pub main: Template,
    /// 404 page (`title`, `method`, `url`, `scripts`).
    pub not_found: Template,
    /// 500 page (`title`, `url`, `error`, `stack`).
    pub error: Template,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            main: Template::parse(MAIN_TEMPLATE),
            not_found: Template::parse(NOT_FOUND_TEMPLATE),
            error: Template::parse(ERROR_TEMPLATE),
        }
    }
}

impl Templates {
    /// Built-ins, overridden by `main.html`, `404.html` and `500.html` from
    /// `dir` when present.
    pub fn load(dir: Option<&Path>) -> io::Result<Self> {
        let mut templates = Self::default();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        for (file, slot) in [
            ("main.html", &mut templates.main),
            ("404.html", &mut templates.not_found),
            ("500.html", &mut templates.error),
        ] {
            match fs::read_to_string(dir.join(file)) {
                Ok(source) => {
                    tracing::debug!(template = file, "Using template override");
                    *slot = Template::parse(&source);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(templates)
    }
}
