//! Field-name rewriting for already-built documents.

use mongo_log_sink_domain::{Document, DocumentValue, sanitize_field_name};

/// Rewrite every field name of `document`, recursing into embedded documents.
///
/// Arrays and other values pass through unchanged, including documents
/// nested inside arrays. Field order is preserved; if two names collapse to
/// the same sanitized name the later value replaces the earlier one.
#[must_use]
pub fn sanitize_document(document: Document) -> Document {
    document
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                DocumentValue::Document(nested) => DocumentValue::Document(sanitize_document(nested)),
                other => other,
            };
            (sanitize_field_name(Some(&name)).into_owned(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc<const N: usize>(fields: [(&str, DocumentValue); N]) -> Document {
        fields.into_iter().collect()
    }

    #[test]
    fn nested_names_are_rewritten_in_order() {
        let input = doc([
            ("Message", DocumentValue::from("boom")),
            (
                "Data",
                DocumentValue::Document(doc([
                    ("Inner.Value", DocumentValue::Int32(1)),
                    ("$type", DocumentValue::from("x")),
                ])),
            ),
        ]);

        let expected = doc([
            ("Message", DocumentValue::from("boom")),
            (
                "Data",
                DocumentValue::Document(doc([
                    ("Inner-Value", DocumentValue::Int32(1)),
                    ("_type", DocumentValue::from("x")),
                ])),
            ),
        ]);
        assert_eq!(sanitize_document(input), expected);
    }

    #[test]
    fn arrays_pass_through_untouched() {
        let array = DocumentValue::Array(vec![DocumentValue::Document(doc([(
            "a.b",
            DocumentValue::Null,
        )]))]);
        let output = sanitize_document(doc([("list.items", array.clone())]));
        assert_eq!(output.get("list-items"), Some(&array));
    }

    #[test]
    fn clean_documents_are_unchanged() {
        let input = doc([("Level", DocumentValue::from("Error"))]);
        assert_eq!(sanitize_document(input.clone()), input);
    }
}
