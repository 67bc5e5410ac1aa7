//! Small utility helpers used across modules.

/// Prefix of `s` holding at most `n` characters, never splitting a code point.
pub fn take_chars(s: &str, n: usize) -> &str {
  match s.char_indices().nth(n) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  let head = take_chars(s, max);
  if head.len() == s.len() { s.to_string() } else { format!("{}… ({} bytes total)", head, s.len()) }
}

/// Split text into sentences on terminal punctuation, keeping the punctuation.
pub fn split_sentences(text: &str) -> Vec<&str> {
  let mut out = Vec::new();
  let mut start = 0;
  for (idx, ch) in text.char_indices() {
    if matches!(ch, '.' | '!' | '?' | '\n') {
      let end = idx + ch.len_utf8();
      let sentence = text[start..end].trim();
      if !sentence.is_empty() {
        out.push(sentence);
      }
      start = end;
    }
  }
  let tail = text[start..].trim();
  if !tail.is_empty() {
    out.push(tail);
  }
  out
}
