use crate::models::ClassificationResult;

// ── Labels ───────────────────────────────────────────────────────────────────

const CATEGORY: &str = "Category:";
const ITEM: &str = "Item:";
const DESCRIPTION: &str = "Description:";
const QUALITY: &str = "Quality:";

// ── Public API ───────────────────────────────────────────────────────────────

/// Parse the model's `Label: value` reply into a [`ClassificationResult`].
///
/// Labels are matched case-insensitively at the start of a line and the value
/// is the trimmed remainder. Unknown lines are skipped, a repeated label keeps
/// its last value and a label that never appears stays `None`.
pub fn parse_classification(text: &str) -> ClassificationResult {
    let mut result = ClassificationResult::default();

    for line in text.split(is_line_break) {
        if let Some(value) = labelled_value(line, CATEGORY) {
            result.category = Some(value);
        } else if let Some(value) = labelled_value(line, ITEM) {
            result.item = Some(value);
        } else if let Some(value) = labelled_value(line, DESCRIPTION) {
            result.description = Some(value);
        } else if let Some(value) = labelled_value(line, QUALITY) {
            result.quality = Some(value);
        }
    }

    result
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Line boundaries: `\n`, a lone `\r`, vertical tab, form feed, the ASCII
/// file/group/record separators, NEL and the Unicode line/paragraph
/// separators. `\r\n` yields an extra empty line, which matches no label.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Slices at the canonical label's byte length. Every casing of these ASCII
/// labels has that same length, so the slice lands right after the colon.
fn labelled_value(line: &str, label: &str) -> Option<String> {
    let prefix = line.get(..label.len())?;
    if !prefix.eq_ignore_ascii_case(label) {
        return None;
    }
    Some(line[label.len()..].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_block() {
        let text = "Category: Toys\nItem: Lego Set\nDescription: A colorful building set.\nQuality: good";
        let result = parse_classification(text);

        assert_eq!(result.category.as_deref(), Some("Toys"));
        assert_eq!(result.item.as_deref(), Some("Lego Set"));
        assert_eq!(result.description.as_deref(), Some("A colorful building set."));
        assert_eq!(result.quality.as_deref(), Some("good"));
    }

    #[test]
    fn test_parse_missing_label_leaves_field_unset() {
        let text = "Category: Books\nItem: Paperback novel\nQuality: fair";
        let result = parse_classification(text);

        assert_eq!(result.category.as_deref(), Some("Books"));
        assert_eq!(result.item.as_deref(), Some("Paperback novel"));
        assert_eq!(result.description, None);
        assert_eq!(result.quality.as_deref(), Some("fair"));
    }

    #[test]
    fn test_parse_labels_case_insensitive_values_verbatim() {
        let text = "CATEGORY: ElecTronics\nitem: iPhone 12 Pro\ndEsCrIpTiOn: Space GREY phone\nquality: Excellent";
        let result = parse_classification(text);

        assert_eq!(result.category.as_deref(), Some("ElecTronics"));
        assert_eq!(result.item.as_deref(), Some("iPhone 12 Pro"));
        assert_eq!(result.description.as_deref(), Some("Space GREY phone"));
        assert_eq!(result.quality.as_deref(), Some("Excellent"));
    }

    #[test]
    fn test_parse_trims_values_and_handles_crlf() {
        let text = "Category:   Clothes   \r\nItem:\tWool scarf\r\n";
        let result = parse_classification(text);

        assert_eq!(result.category.as_deref(), Some("Clothes"));
        assert_eq!(result.item.as_deref(), Some("Wool scarf"));
    }

    #[test]
    fn test_parse_splits_on_every_line_boundary() {
        let result = parse_classification("Category: Toys\rItem: Lego");
        assert_eq!(result.category.as_deref(), Some("Toys"));
        assert_eq!(result.item.as_deref(), Some("Lego"));

        let text = "Category: Books\u{2028}Item: Atlas\x0bDescription: Hardcover\x0cQuality: fair";
        let result = parse_classification(text);
        assert_eq!(result.category.as_deref(), Some("Books"));
        assert_eq!(result.item.as_deref(), Some("Atlas"));
        assert_eq!(result.description.as_deref(), Some("Hardcover"));
        assert_eq!(result.quality.as_deref(), Some("fair"));

        let result = parse_classification("Item: Kite\u{85}Quality: good\u{2029}");
        assert_eq!(result.item.as_deref(), Some("Kite"));
        assert_eq!(result.quality.as_deref(), Some("good"));
    }

    #[test]
    fn test_parse_ignores_unlabelled_and_indented_lines() {
        let text = "Here is the classification:\n  Category: Toys\nNotes: none\nItem: Yo-yo";
        let result = parse_classification(text);

        // Labels must start the line.
        assert_eq!(result.category, None);
        assert_eq!(result.item.as_deref(), Some("Yo-yo"));
        assert_eq!(result.quality, None);
    }

    #[test]
    fn test_parse_last_occurrence_wins() {
        let text = "Quality: poor\nQuality: good";
        assert_eq!(parse_classification(text).quality.as_deref(), Some("good"));
    }

    #[test]
    fn test_parse_empty_label_value() {
        let result = parse_classification("Item:");
        assert_eq!(result.item.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_empty_and_short_input() {
        assert_eq!(parse_classification(""), ClassificationResult::default());
        assert_eq!(parse_classification("Cat"), ClassificationResult::default());
    }

    #[test]
    fn test_parse_multibyte_line_does_not_panic() {
        let result = parse_classification("カテゴリー: おもちゃ\nItem: ぬいぐるみ");
        assert_eq!(result.category, None);
        assert_eq!(result.item.as_deref(), Some("ぬいぐるみ"));
    }
}
