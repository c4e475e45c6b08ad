//! Lexical rules of the emitted language.

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null", "_",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Parameterless methods every class inherits from `java.lang.Object`.
const OBJECT_NULLARY_METHODS: &[&str] = &[
    "clone", "finalize", "getClass", "hashCode", "notify", "notifyAll", "toString", "wait",
];

/// Whether a parameterless method called `name` would clash with one
/// inherited from `java.lang.Object`.
pub fn is_object_method(name: &str) -> bool {
    OBJECT_NULLARY_METHODS.contains(&name)
}

/// A syntactically valid, non-reserved identifier.
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') && !is_keyword(word)
}

/// Check that every bracket pair in `source` is balanced, skipping string
/// and character literals and comments.
pub fn balanced_delimiters(source: &str) -> Result<(), String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                let mut escaped = false;
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if inner == '\\' {
                        escaped = true;
                    } else if inner == c {
                        closed = true;
                        break;
                    } else if inner == '\n' {
                        break;
                    }
                }
                if !closed {
                    return Err(format!("unterminated literal at offset {at}"));
                }
            }
            '/' if chars.peek().map(|(_, n)| *n) == Some('/') => {
                for (_, inner) in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek().map(|(_, n)| *n) == Some('*') => {
                chars.next();
                let mut prev = ' ';
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        closed = true;
                        break;
                    }
                    prev = inner;
                }
                if !closed {
                    return Err(format!("unterminated comment at offset {at}"));
                }
            }
            '(' | '{' | '[' => stack.push((c, at)),
            ')' | '}' | ']' => {
                let expected = match c {
                    ')' => '(',
                    '}' => '{',
                    _ => '[',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, open_at)) => {
                        return Err(format!(
                            "`{c}` at offset {at} closes `{open}` opened at offset {open_at}"
                        ))
                    }
                    None => return Err(format!("unmatched `{c}` at offset {at}")),
                }
            }
            _ => {}
        }
    }
    match stack.pop() {
        Some((open, at)) => Err(format!("`{open}` opened at offset {at} is never closed")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("delegate"));
        assert!(is_identifier("$impl_2"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("get-value"));
        assert!(!is_identifier("_"));
    }

    #[test]
    fn object_methods() {
        assert!(is_object_method("toString"));
        assert!(is_object_method("getClass"));
        assert!(!is_object_method("equals"));
        assert!(!is_object_method("delegate"));
    }

    #[test]
    fn delimiters() {
        assert!(balanced_delimiters("class A { void f(int[] a) { g(\")\"); } }").is_ok());
        assert!(balanced_delimiters("// (\nclass A {}").is_ok());
        assert!(balanced_delimiters("/* { */ class A {}").is_ok());
        assert!(balanced_delimiters("class A { void f( }").is_err());
        assert!(balanced_delimiters("class A { } }").is_err());
        assert!(balanced_delimiters("String s = \"open").is_err());
    }
}
