use crate::block::QuizKind;

/// A parsed kramdown inline attribute list: `.class #id key="value"`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct AttributeList {
    pub classes: Vec<String>,
    pub id: Option<String>,
    /// Key/value pairs in source order.
    pub pairs: Vec<(String, String)>,
}

impl AttributeList {
    /// Every quiz kind named by a class, in order.
    pub fn quiz_kinds(&self) -> Vec<QuizKind> {
        self.classes
            .iter()
            .filter_map(|class| class.parse().ok())
            .collect()
    }

    /// Value of `key`. A repeated key takes its last value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Cheap check for a quiz kind class, used when the list does not parse.
pub(crate) fn mentions_quiz_kind(text: &str) -> bool {
    text.split_whitespace()
        .any(|token| QuizKind::from_class(token).is_some())
}

/// Parse the inside of `{: ... }`.
pub(crate) fn parse_attribute_list(text: &str) -> Result<AttributeList, String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut i = 0;
    let mut list = AttributeList::default();

    while i < len {
        match chars[i] {
            c if c.is_whitespace() => {
                i += 1;
            }

            // Class: .name
            '.' => {
                i += 1;
                let name = read_word(&chars, &mut i);
                if name.is_empty() {
                    return Err("empty class name".into());
                }
                list.classes.push(name);
            }

            // Identifier: #name
            '#' => {
                i += 1;
                let name = read_word(&chars, &mut i);
                if name.is_empty() {
                    return Err("empty `#id`".into());
                }
                if list.id.is_some() {
                    return Err(format!("more than one `#id` (`#{}`)", name));
                }
                list.id = Some(name);
            }

            // Pair: key="value", key='value' or key=value
            _ => {
                let start = i;
                while i < len && chars[i] != '=' && !chars[i].is_whitespace() {
                    i += 1;
                }
                let key: String = chars[start..i].iter().collect();
                if i >= len || chars[i] != '=' {
                    return Err(format!("unexpected token `{}`", key));
                }
                if key.is_empty() {
                    return Err("attribute without a name".into());
                }
                i += 1; // skip '='

                let value = match chars.get(i) {
                    Some(&quote) if quote == '"' || quote == '\'' => {
                        i += 1;
                        read_quoted(&chars, &mut i, quote)
                            .ok_or_else(|| format!("unterminated quote in `{}`", key))?
                    }
                    _ => read_word(&chars, &mut i),
                };
                list.pairs.push((key, value));
            }
        }
    }

    Ok(list)
}

fn read_word(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    while *i < chars.len() && !chars[*i].is_whitespace() {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}

/// Read up to the closing `quote`, resolving backslash escapes.
/// Returns None when the quote is never closed.
fn read_quoted(chars: &[char], i: &mut usize, quote: char) -> Option<String> {
    let mut value = String::new();
    while *i < chars.len() {
        let c = chars[*i];
        if c == '\\' && *i + 1 < chars.len() {
            value.push(chars[*i + 1]);
            *i += 2;
        } else if c == quote {
            *i += 1;
            return Some(value);
        } else {
            value.push(c);
            *i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quiz_metadata() {
        let list = parse_attribute_list(
            r#".choose_best #html_indentation title="HTML Indentation" points="1" answer="2""#,
        )
        .unwrap();
        assert_eq!(list.classes, vec!["choose_best"]);
        assert_eq!(list.id.as_deref(), Some("html_indentation"));
        assert_eq!(list.get("title"), Some("HTML Indentation"));
        assert_eq!(list.get("points"), Some("1"));
        assert_eq!(list.get("answer"), Some("2"));
        assert_eq!(list.quiz_kinds(), vec![QuizKind::ChooseBest]);
    }

    #[test]
    fn single_quotes_bare_values_and_escapes() {
        let list = parse_attribute_list(r#"a='x y' b=3 c="say \"hi\"""#).unwrap();
        assert_eq!(list.get("a"), Some("x y"));
        assert_eq!(list.get("b"), Some("3"));
        assert_eq!(list.get("c"), Some(r#"say "hi""#));
    }

    #[test]
    fn repeated_key_takes_last_value() {
        let list = parse_attribute_list(r#"points="1" points="2""#).unwrap();
        assert_eq!(list.get("points"), Some("2"));
    }

    #[test]
    fn rejects_malformed_lists() {
        assert!(parse_attribute_list(r#"title="open"#).is_err());
        assert!(parse_attribute_list("stray").is_err());
        assert!(parse_attribute_list("#a #b").is_err());
        assert!(parse_attribute_list(". #a").is_err());
    }

    #[test]
    fn non_quiz_classes_are_kept() {
        let list = parse_attribute_list(".note .wide").unwrap();
        assert!(list.quiz_kinds().is_empty());
        assert!(!mentions_quiz_kind(".note .wide"));
        assert!(mentions_quiz_kind(r#".free_text_number title="unterminated"#));
    }
}
