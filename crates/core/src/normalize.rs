//! Lenient label normalization for values that arrive as free text from the model.
//!
//! Every enum the model can name implements [`LenientEnum`]: a strict `parse` that knows
//! canonical names plus synonyms (English and Dutch), and a documented safe default used by
//! [`LenientEnum::normalize`] when nothing matches. Unknown input is logged, never dropped.

use tracing::warn;

pub trait LenientEnum: Sized + Copy {
    /// Name used in log events, e.g. `"urgency"`.
    const KIND: &'static str;
    /// Safe value used when the label is not recognised.
    const FALLBACK: Self;

    fn parse(raw: &str) -> Option<Self>;

    fn normalize(raw: &str) -> Self {
        match Self::parse(raw) {
            Some(value) => value,
            None => {
                warn!(
                    event_name = "normalize.unrecognized_label",
                    kind = Self::KIND,
                    raw_value = raw,
                    "unrecognized label, using safe default"
                );
                Self::FALLBACK
            }
        }
    }
}

/// Folds a label to `snake_case` ascii: trims, lowercases, maps separators to `_` and strips
/// the diacritics that show up in Dutch input (`ë`, `é`, ...).
pub fn fold_label(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    let mut last_was_separator = true;
    let mut last_was_lowercase = false;

    for character in raw.trim().chars() {
        let mapped = match character {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
            other => other,
        };

        if mapped.is_ascii_alphanumeric() {
            // camelCase boundaries become separators: "ManualIntervention" -> "manual_intervention"
            if mapped.is_ascii_uppercase() && last_was_lowercase {
                folded.push('_');
            }
            folded.push(mapped.to_ascii_lowercase());
            last_was_separator = false;
            last_was_lowercase = mapped.is_ascii_lowercase();
        } else {
            if !last_was_separator {
                folded.push('_');
            }
            last_was_separator = true;
            last_was_lowercase = false;
        }
    }

    while folded.ends_with('_') {
        folded.pop();
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::fold_label;

    #[test]
    fn folds_case_separators_and_camel_case() {
        assert_eq!(fold_label("  Manual Intervention "), "manual_intervention");
        assert_eq!(fold_label("ManualIntervention"), "manual_intervention");
        assert_eq!(fold_label("manual-intervention"), "manual_intervention");
        assert_eq!(fold_label("REQUEST_INFO"), "request_info");
        assert_eq!(fold_label("RequestInfo!!"), "request_info");
    }

    #[test]
    fn strips_dutch_diacritics() {
        assert_eq!(fold_label("Geëscaleerd"), "geescaleerd");
        assert_eq!(fold_label("categorieën"), "categorieen");
    }

    #[test]
    fn empty_input_folds_to_empty() {
        assert_eq!(fold_label("   "), "");
        assert_eq!(fold_label("--"), "");
    }
}
