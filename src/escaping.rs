//! `%XX` escaping of characters that are special in build files.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet};

/// Characters `escape` replaces with their `%XX` form.
const SPECIAL_CHARACTERS: &AsciiSet = &AsciiSet::EMPTY
    .add(b'%')
    .add(b'*')
    .add(b'?')
    .add(b'@')
    .add(b'$')
    .add(b'(')
    .add(b')')
    .add(b';')
    .add(b'\'');

/// Escapes with lowercase hex digits, e.g. `a;b` becomes `a%3bb`. Non-ASCII
/// text is kept as is.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        let ascii_len = rest.find(|c: char| !c.is_ascii()).unwrap_or(rest.len());
        let (ascii, tail) = rest.split_at(ascii_len);
        for chunk in utf8_percent_encode(ascii, SPECIAL_CHARACTERS) {
            // '%' is in the set, so only encoded chunks start with it
            if chunk.starts_with('%') {
                escaped.push_str(&chunk.to_ascii_lowercase());
            } else {
                escaped.push_str(chunk);
            }
        }

        let other_len = tail.find(|c: char| c.is_ascii()).unwrap_or(tail.len());
        let (other, tail) = tail.split_at(other_len);
        escaped.push_str(other);
        rest = tail;
    }
    escaped
}

/// Replaces every `%XX` (two hex digits) with the byte it encodes, in a
/// single left-to-right pass: `%2520` becomes `%20`, not a space. A `%` not
/// followed by two hex digits is kept as is. Decoded bytes are read as UTF-8.
pub fn unescape_all(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}
