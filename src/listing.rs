//! HTML directory listing

use std::path::Path;

use percent_encoding::{ AsciiSet, CONTROLS, utf8_percent_encode };

/// Characters escaped in listing hrefs; keeps `/` so nested links stay relative.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// One row of a listing: name as displayed and the relative link target.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ListingEntry {
    pub(crate) display: String,
    pub(crate) href: String,
}

/// Read `dir` and return its entries sorted case-insensitively; directories end in `/`,
/// symlinks display with a trailing `@`.
pub(crate) fn read_entries(dir: &Path) -> std::io::Result<Vec<ListingEntry>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let file_type = entry.file_type()?;
        let is_dir = entry.path().is_dir();
        names.push((name, is_dir, file_type.is_symlink()));
    }
    names.sort_by_key(|(name, _, _)| name.to_lowercase());

    Ok(names
        .into_iter()
        .map(|(name, is_dir, is_link)| {
            let mut display = name.clone();
            let mut href = utf8_percent_encode(&name, HREF).to_string();
            if is_dir {
                display.push('/');
                href.push('/');
            }
            if is_link {
                display.push('@');
            }
            ListingEntry { display, href }
        })
        .collect())
}

/// Render a full HTML page listing `dir`, titled with the decoded request path.
pub(crate) fn render(dir: &Path, display_path: &str) -> std::io::Result<String> {
    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );
    for entry in read_entries(dir)? {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            entry.href,
            escape_html(&entry.display)
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    Ok(html)
}
