//! Pure helpers over an archive's entry names.
//!
//! Nothing here fetches or parses anything; the binary uses these to select
//! entries and to print listings.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Check if a pattern contains glob wildcard characters.
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters (including `/`)
/// - `?` matches exactly one character
///
/// # Examples
///
/// ```
/// use cloud_unzip::listing::glob_match;
///
/// assert!(glob_match("*.txt", "readme.txt"));
/// assert!(glob_match("file?.dat", "file1.dat"));
/// assert!(!glob_match("*.txt", "readme.md"));
/// ```
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // Iterative matcher with single-star backtracking
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[derive(Default)]
struct TreeNode<'a> {
    children: BTreeMap<&'a str, TreeNode<'a>>,
}

/// Render entry names as an indented tree, followed by the entry count.
///
/// ```text
/// ├── docs
/// │   └── readme.md
/// └── x.txt
///
/// Total files: 2
/// ```
pub fn render_tree<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut root = TreeNode::default();
    let mut count = 0usize;

    for name in names {
        count += 1;
        let mut node = &mut root;
        for part in name.split('/').filter(|part| !part.is_empty()) {
            node = node.children.entry(part).or_default();
        }
    }

    let mut out = String::new();
    render_children(&root, "", &mut out);
    let _ = write!(out, "\nTotal files: {count}");
    out
}

fn render_children(node: &TreeNode<'_>, prefix: &str, out: &mut String) {
    let last = node.children.len().saturating_sub(1);
    for (i, (name, child)) in node.children.iter().enumerate() {
        let (connector, indent) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let _ = writeln!(out, "{prefix}{connector}{name}");
        render_children(child, &format!("{prefix}{indent}"), out);
    }
}

/// Format a byte size into a human-readable string.
///
/// ```
/// use cloud_unzip::listing::format_size;
///
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// assert_eq!(format_size(1048576), "1.00 MB");
/// ```
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
