use crate::models::{Frame, FRAME_LANG};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha512};

/// Maximum number of backtrace lines turned into frames.
pub(crate) const MAX_FRAMES: usize = 50;

const UNKNOWN_FUNCTION: &str = "unknown";

/// `path/to/file.rb:42` optionally followed by `:in `method'`. Ruby 3.4 and later quote the
/// method with a plain apostrophe on both sides.
static FRAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<file>.+?):(?P<line>\d+)(?::in [`'](?P<function>.+)')?$")
        .expect("frame pattern is valid")
});

/// Turn one raw backtrace line into a frame. Never fails: lines that don't look like a
/// backtrace entry become unresolved frames carrying the raw line as file name.
pub(crate) fn resolve_frame(line: &str, root_path: Option<&str>) -> Frame {
    let parsed = FRAME_PATTERN.captures(line).and_then(|captures| {
        let file = captures.name("file")?.as_str();
        let line_number: u32 = captures.name("line")?.as_str().parse().ok()?;
        let function = captures.name("function").map(|m| m.as_str());
        Some((file, line_number, function))
    });

    match parsed {
        Some((file, line_number, function)) => {
            let raw_id = hash(&format!(
                "{}:{}:{}",
                file,
                line_number,
                function.unwrap_or_default()
            ));
            let function = function.unwrap_or(UNKNOWN_FUNCTION).to_string();
            Frame {
                raw_id,
                filename: file.to_string(),
                lineno: Some(line_number),
                resolved_name: Some(function.clone()),
                function: Some(function),
                in_app: is_in_app(file, root_path),
                lang: FRAME_LANG,
                resolved: true,
            }
        }
        None => Frame {
            raw_id: hash(line),
            filename: line.to_string(),
            lineno: None,
            function: None,
            in_app: false,
            resolved_name: None,
            lang: FRAME_LANG,
            resolved: false,
        },
    }
}

fn is_in_app(file: &str, root_path: Option<&str>) -> bool {
    match root_path {
        Some(root) if !root.is_empty() => file.starts_with(root),
        _ => false,
    }
}

fn hash(input: &str) -> String {
    format!("{:x}", Sha512::digest(input.as_bytes()))
}
