//! Source rewriting applied before tree-sitter sees a header.
//!
//! Every rewrite replaces bytes with spaces and keeps newlines, so byte
//! offsets and line numbers in the rewritten text match the original.

use regex::Regex;

/// Rewrite `source` so export and deprecation macros and C++ linkage guards
/// do not disturb the C grammar.
pub fn preprocess(source: &str, macros: &[String]) -> String {
    let unguarded = blank_cplusplus_guards(source);
    strip_macros(&unguarded, macros)
}

/// Blank every whole-word use of a name in `macros`.
///
/// Function-like uses (`NAME(...)`) are blanked together with their
/// argument list. Preprocessor directive lines are left untouched.
pub fn strip_macros(source: &str, macros: &[String]) -> String {
    let names: Vec<String> = macros
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| regex::escape(name))
        .collect();
    if names.is_empty() {
        return source.to_string();
    }

    let pattern = format!(r"\b(?:{})\b", names.join("|"));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(error = %e, "invalid macro list, leaving source unchanged");
            return source.to_string();
        }
    };

    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();

    for m in re.find_iter(source) {
        if in_directive(source, m.start()) {
            continue;
        }
        blank(&mut out, m.start(), m.end());

        let mut pos = m.end();
        while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
            pos += 1;
        }
        if pos < bytes.len() && bytes[pos] == b'(' {
            if let Some(close) = matching_paren(bytes, pos) {
                blank(&mut out, pos, close + 1);
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Blank `#ifdef __cplusplus` arms, which hold `extern "C" {` and its
/// closing brace in separate conditional blocks.
pub fn blank_cplusplus_guards(source: &str) -> String {
    let mut frames: Vec<Guard> = Vec::new();
    let mut out = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let mut blank_line = frames.iter().any(|g| *g == Guard::Blanking);

        if let Some((keyword, arg)) = directive(line) {
            match keyword {
                "ifdef" | "if" if is_cplusplus_test(keyword, arg) => {
                    frames.push(Guard::Blanking);
                    blank_line = true;
                }
                "if" | "ifdef" | "ifndef" => frames.push(Guard::Other),
                "else" | "elif" => {
                    if let Some(top) = frames.last_mut() {
                        if *top == Guard::Blanking {
                            *top = Guard::Passed;
                            blank_line = true;
                        }
                    }
                }
                "endif" => {
                    if let Some(top) = frames.pop() {
                        if top != Guard::Other {
                            blank_line = true;
                        }
                    }
                }
                _ => {}
            }
        }

        if blank_line {
            out.push_str(&blank_text(line));
        } else {
            out.push_str(line);
        }
    }

    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Guard {
    /// Inside the C++-only arm.
    Blanking,
    /// Past `#else` of a C++ guard.
    Passed,
    Other,
}

fn is_cplusplus_test(keyword: &str, arg: &str) -> bool {
    match keyword {
        "ifdef" => arg == "__cplusplus",
        _ => !arg.starts_with('!') && arg.contains("__cplusplus"),
    }
}

/// Split a preprocessor line into keyword and argument.
fn directive(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix('#')?.trim();
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    Some((&rest[..end], rest[end..].trim()))
}

/// True when `pos` sits on a preprocessor line or its continuation.
fn in_directive(source: &str, pos: usize) -> bool {
    let mut line_start = source[..pos].rfind('\n').map_or(0, |i| i + 1);
    loop {
        if source[line_start..].trim_start().starts_with('#') {
            return true;
        }
        if line_start == 0 {
            return false;
        }
        let prev_end = line_start - 1;
        let prev = source[..prev_end].trim_end_matches('\r');
        if !prev.ends_with('\\') {
            return false;
        }
        line_start = prev.rfind('\n').map_or(0, |i| i + 1);
    }
}

fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn blank(out: &mut [u8], start: usize, end: usize) {
    for b in &mut out[start..end] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn blank_text(line: &str) -> String {
    line.bytes()
        .map(|b| if b == b'\n' { '\n' } else { ' ' })
        .collect()
}
