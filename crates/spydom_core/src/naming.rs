/// Deterministic, injective directory name for a target identity.
///
/// `://` becomes `-` and slashes are kept as directory separators, so
/// `https://example.com/a/b` maps to `https-example.com/a/b`. Everything that
/// could make two identities share a path, or escape the output root, is
/// percent-encoded: `%` itself, characters that are not portable in a path
/// segment, and any `/` that would introduce an empty, `.` or `..` segment.
pub fn output_dir_name(identity: &str) -> String {
    let flattened = identity.replacen("://", "-", 1);
    let segments: Vec<&str> = flattened.split('/').collect();

    let mut name = String::with_capacity(flattened.len());
    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            if is_plain_segment(segment) {
                name.push('/');
            } else {
                name.push_str("%2F");
            }
        }
        for c in segment.chars() {
            push_escaped(&mut name, c);
        }
    }
    name
}

fn is_plain_segment(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

fn push_escaped(out: &mut String, c: char) {
    if c == '%' || is_forbidden(c) {
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("%{byte:02X}"));
        }
    } else {
        out.push(c);
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}'
    )
}
