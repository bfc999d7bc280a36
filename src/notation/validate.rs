use super::scanner::{match_token, OPEN};
use super::types::{NotationRef, NotationSourceType, NotationValidation, RefType};

/// Reports every problem in `text` without modifying it:
/// unclosed `${`, closed but malformed tokens, and references whose source type or
/// reference type is outside the known vocabulary.
pub fn validate(text: &str) -> NotationValidation {
    let mut errors = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(OPEN) {
        let at = cursor + offset;
        if let Some((reference, end)) = match_token(text, at) {
            check_vocabulary(&reference, &mut errors);
            cursor = end;
            continue;
        }

        let body = at + OPEN.len();
        let close = text[body..].find('}').map(|o| body + o);
        let next_open = text[body..].find(OPEN).map(|o| body + o);
        let position = text[..at].chars().count();
        match close {
            Some(c) if next_open.map_or(true, |n| c < n) => {
                errors.push(format!("Malformed reference at position {}: '{}'", position, &text[at..=c]));
                cursor = c + 1;
            }
            _ => {
                errors.push(format!("Unclosed brace at position {}: '${{' has no matching '}}'", position));
                cursor = body;
            }
        }
    }

    NotationValidation { is_valid: errors.is_empty(), errors }
}

fn check_vocabulary(reference: &NotationRef, errors: &mut Vec<String>) {
    if NotationSourceType::parse(&reference.source_type).is_none() {
        let expected: Vec<&str> = NotationSourceType::ALL.iter().map(|t| t.as_str()).collect();
        errors.push(format!(
            "Invalid source type '{}' in reference '{}' (expected one of: {})",
            reference.source_type,
            reference.value_key,
            expected.join(", ")
        ));
    }
    if RefType::parse(&reference.ref_type).is_none() {
        let expected: Vec<&str> = RefType::ALL.iter().map(|t| t.as_str()).collect();
        errors.push(format!(
            "Invalid reference type '{}' in reference '{}' (expected one of: {})",
            reference.ref_type,
            reference.value_key,
            expected.join(", ")
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclosed_brace() {
        let v = validate("${incomplete");
        assert!(!v.is_valid);
        assert_eq!(v.errors.len(), 1);
        let msg = v.errors[0].to_lowercase();
        assert!(msg.contains("unclosed") && msg.contains("brace"), "{}", msg);
    }

    #[test]
    fn test_unclosed_before_next_opener() {
        // The first token runs into a second `${` before any `}`.
        let v = validate("a ${x, tooltip:calculated-key ${y, tooltip:calculated-key:z} b");
        assert_eq!(v.errors.len(), 1);
        assert!(v.errors[0].starts_with("Unclosed brace at position 2"), "{:?}", v.errors);
    }

    #[test]
    fn test_malformed_closed_token() {
        let v = validate("see ${revenue} here");
        assert!(!v.is_valid);
        assert_eq!(v.errors, vec!["Malformed reference at position 4: '${revenue}'".to_string()]);
    }

    #[test]
    fn test_vocabulary_errors() {
        let v = validate("${a, tooltip:guess-key:x} ${b, tooltip:calculated-row:7}");
        assert_eq!(v.errors.len(), 2);
        assert!(v.errors[0].contains("Invalid source type 'guess'"));
        assert!(v.errors[1].contains("Invalid reference type 'row'"));
    }

    #[test]
    fn test_valid_text() {
        let v = validate(
            "NOI of ${noi, tooltip:calculated-key:netOperatingIncome} from rent ${rent, tooltip:sourceDocument-index:3}.",
        );
        assert_eq!(v, NotationValidation { is_valid: true, errors: vec![] });
        assert!(validate("").is_valid);
        assert!(validate("costs $5 {approx}").is_valid);
    }
}
