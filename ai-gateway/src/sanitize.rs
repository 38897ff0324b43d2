/// Strips unbalanced brackets, braces and quotes from `text` via a single
/// bracket-depth scan. Used to salvage near-valid JSON a model emits with
/// a trailing unclosed `{`/`[`/`"` before a retry attempt.
pub fn sanitize(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut keep = vec![true; chars.len()];
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut in_string = false;
    let mut string_start: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if c == '"' && !is_escaped(&chars, i) {
                in_string = false;
                string_start = None;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                string_start = Some(i);
            }
            '{' | '[' => stack.push((c, i)),
            '}' => {
                if !matches!(stack.last(), Some(('{', _))) {
                    keep[i] = false;
                } else {
                    stack.pop();
                }
            }
            ']' => {
                if !matches!(stack.last(), Some(('[', _))) {
                    keep[i] = false;
                } else {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    // Anything left open never got a matching close; drop the opener.
    for (_, idx) in stack {
        keep[idx] = false;
    }
    // An unterminated string: drop the dangling opening quote.
    if in_string {
        if let Some(idx) = string_start {
            keep[idx] = false;
        }
    }

    chars
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect()
}

fn is_escaped(chars: &[char], idx: usize) -> bool {
    let mut backslashes = 0;
    let mut i = idx;
    while i > 0 {
        i -= 1;
        if chars[i] == '\\' {
            backslashes += 1;
        } else {
            break;
        }
    }
    backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_balanced_json_untouched() {
        let input = r#"{"a": [1, 2, 3], "b": "text"}"#;
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn drops_unmatched_closing_brace() {
        assert_eq!(sanitize("{\"a\": 1}}"), "{\"a\": 1}");
    }

    #[test]
    fn drops_unclosed_opening_bracket() {
        assert_eq!(sanitize("[1, 2, 3"), "1, 2, 3");
    }

    #[test]
    fn drops_unterminated_quote() {
        assert_eq!(sanitize("{\"a\": \"unterminated}"), "{\"a\": unterminated}");
    }

    #[test]
    fn empty_input_is_stable() {
        assert_eq!(sanitize(""), "");
    }
}
