//! Source notation: value references with provenance embedded in narrative text.
//!
//! A token looks like `${noi, tooltip:calculated-key:netOperatingIncome}`. Text
//! around tokens is preserved exactly, so reasoning strings stay readable while a UI
//! can resolve each token into a tooltip.
//!
//! Reading never fails on malformed input. `parse`, `replace` and
//! `extract_references` treat anything that is not a well-formed token as literal
//! text; `validate` is the only place problems are reported. `annotate` refuses to
//! build a token the scanner would not read back.

pub mod error;
mod scanner;
pub mod types;
mod validate;

pub use error::NotationError;
pub use types::{NotationRef, NotationSourceType, NotationValidation, ParsedSegment, RefType, SegmentKind};
pub use validate::validate;

use crate::source::{SourceReference, SourceType};

/// Splits `text` into ordered text and reference segments. Empty gaps are omitted;
/// concatenating every segment's `content` yields `text` unchanged.
pub fn parse(text: &str) -> Vec<ParsedSegment> {
    scanner::scan(text)
}

/// Canonical token for `reference`: exactly one space after the comma.
pub fn generate(reference: &NotationRef) -> String {
    format!(
        "${{{}, tooltip:{}-{}:{}}}",
        reference.value_key, reference.source_type, reference.ref_type, reference.ref_value
    )
}

pub fn extract_references(text: &str) -> Vec<NotationRef> {
    parse(text).into_iter().filter_map(|s| s.reference).collect()
}

/// Substitutes each token with `resolver(reference)`; text segments are untouched.
pub fn replace<F>(text: &str, mut resolver: F) -> String
where
    F: FnMut(&NotationRef) -> String,
{
    let mut out = String::with_capacity(text.len());
    for segment in parse(text) {
        match &segment.reference {
            Some(reference) => out.push_str(&resolver(reference)),
            None => out.push_str(&segment.content),
        }
    }
    out
}

/// Joins segments back into the original text.
pub fn reconstruct(segments: &[ParsedSegment]) -> String {
    segments.iter().map(|s| s.content.as_str()).collect()
}

/// Builds a token for `value_key` from a provenance record.
///
/// The cited value is the first non-empty of the reference's index, key and id,
/// then the display path. `}` in that value is replaced by `)` so the token stays
/// well-formed.
pub fn annotate(value_key: &str, source: &SourceReference) -> Result<String, NotationError> {
    if value_key.is_empty() || !value_key.bytes().all(scanner::is_word) {
        return Err(NotationError::InvalidValueKey(value_key.to_string()));
    }

    let source_type = match source.source_type {
        SourceType::UserInput => NotationSourceType::UserInput,
        SourceType::ParsedDocument => NotationSourceType::SourceDocument,
        SourceType::Calculated => NotationSourceType::Calculated,
        SourceType::Default | SourceType::Assumption => NotationSourceType::Assumption,
    };
    let r = &source.reference;
    let candidates = [
        (RefType::Index, r.index.map(|i| i.to_string())),
        (RefType::Key, r.key.clone()),
        (RefType::Id, r.id.clone()),
        (RefType::Key, Some(source.display_path.clone())),
    ];
    let (ref_type, ref_value) = candidates
        .into_iter()
        .find_map(|(t, v)| v.filter(|v| !v.is_empty()).map(|v| (t, v)))
        .ok_or_else(|| NotationError::EmptyReference { value_key: value_key.to_string() })?;

    Ok(generate(&NotationRef::new(
        value_key,
        source_type.as_str(),
        ref_type.as_str(),
        &ref_value.replace('}', ")"),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DocumentLocation;
    use proptest::prelude::*;

    const SAMPLE: &str = "NOI is ${noi, tooltip:calculated-key:netOperatingIncome} on rent of ${rent,tooltip:sourceDocument-index:4}.";

    #[test]
    fn test_parse_segments() {
        let segs = parse(SAMPLE);
        let kinds: Vec<SegmentKind> = segs.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SegmentKind::Text, SegmentKind::Reference, SegmentKind::Text, SegmentKind::Reference, SegmentKind::Text]
        );
        assert_eq!(segs[0].content, "NOI is ");
        assert_eq!(segs[3].reference.as_ref().unwrap(), &NotationRef::new("rent", "sourceDocument", "index", "4"));
        assert_eq!(reconstruct(&segs), SAMPLE);
    }

    #[test]
    fn test_edge_cases() {
        assert!(parse("").is_empty());
        assert_eq!(parse("plain text"), vec![ParsedSegment::text("plain text")]);

        let adjacent = "${a, tooltip:calculated-key:x}${b, tooltip:calculated-key:y}";
        let segs = parse(adjacent);
        assert_eq!(segs.len(), 2);
        assert!(segs.iter().all(|s| s.kind == SegmentKind::Reference));
    }

    #[test]
    fn test_generate_is_canonical() {
        let segs = parse("${rent,\ttooltip:sourceDocument-index:4}");
        let r = segs[0].reference.as_ref().unwrap();
        assert_eq!(generate(r), "${rent, tooltip:sourceDocument-index:4}");
    }

    #[test]
    fn test_extract_and_replace() {
        let refs = extract_references(SAMPLE);
        assert_eq!(refs.iter().map(|r| r.value_key.as_str()).collect::<Vec<_>>(), vec!["noi", "rent"]);

        let out = replace(SAMPLE, |r| match r.value_key.as_str() {
            "noi" => "$80,000".to_string(),
            _ => format!("[{}]", r.ref_value),
        });
        assert_eq!(out, "NOI is $80,000 on rent of [4].");
        assert_eq!(replace("no tokens ${here", |_| unreachable!()), "no tokens ${here");
    }

    #[test]
    fn test_annotate_maps_provenance() {
        let calc = SourceReference::calculated("netOperatingIncome");
        assert_eq!(annotate("noi", &calc).unwrap(), "${noi, tooltip:calculated-key:netOperatingIncome}");

        let doc = SourceReference::parsed_document(7, DocumentLocation { file_name: "t12.pdf".into(), ..Default::default() }, None);
        assert_eq!(annotate("rent", &doc).unwrap(), "${rent, tooltip:sourceDocument-index:7}");

        let dflt = SourceReference::default_value("vacancyRate");
        let token = annotate("vacancy", &dflt).unwrap();
        assert_eq!(token, "${vacancy, tooltip:assumption-key:vacancyRate}");
        assert!(validate(&token).is_valid);

        let odd = SourceReference::user_input("weird}key", None);
        assert!(validate(&annotate("w", &odd).unwrap()).is_valid);
    }

    #[test]
    fn test_annotate_empty_key_cites_display_path() {
        let token = annotate("noi", &SourceReference::calculated("")).unwrap();
        assert_eq!(token, "${noi, tooltip:calculated-key:Calculated > }");
        assert!(validate(&token).is_valid);
        assert_eq!(extract_references(&token).len(), 1);

        let mut with_id = SourceReference::calculated("");
        with_id.reference.id = Some("calc-7".into());
        assert_eq!(annotate("noi", &with_id).unwrap(), "${noi, tooltip:calculated-id:calc-7}");
    }

    #[test]
    fn test_annotate_rejects_uncitable_input() {
        let mut bare = SourceReference::calculated("");
        bare.display_path.clear();
        assert_eq!(
            annotate("noi", &bare),
            Err(NotationError::EmptyReference { value_key: "noi".into() })
        );

        let calc = SourceReference::calculated("netOperatingIncome");
        for key in ["", "net income", "noi-2"] {
            assert_eq!(annotate(key, &calc), Err(NotationError::InvalidValueKey(key.into())));
        }
    }

    fn word() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_]{1,12}"
    }

    proptest! {
        #[test]
        fn prop_generate_then_parse_round_trips(
            value_key in word(),
            source_type in word(),
            ref_type in word(),
            ref_value in "[^}]{1,24}",
        ) {
            let r = NotationRef { value_key, source_type, ref_type, ref_value };
            let segs = parse(&generate(&r));
            prop_assert_eq!(segs.len(), 1);
            prop_assert_eq!(segs[0].kind, SegmentKind::Reference);
            prop_assert_eq!(segs[0].reference.as_ref(), Some(&r));
        }

        #[test]
        fn prop_segments_cover_input(text in ".{0,80}") {
            let segs = parse(&text);
            prop_assert_eq!(reconstruct(&segs), text.clone());
            prop_assert!(segs.iter().all(|s| !s.content.is_empty()));
            prop_assert!(segs.windows(2).all(|w| !(w[0].kind == SegmentKind::Text && w[1].kind == SegmentKind::Text)));
        }
    }
}
