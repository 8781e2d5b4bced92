// ---------------------------------------------------------------------------
// Ordinal rank mapping – the one place the label order is declared
// ---------------------------------------------------------------------------

const LOW_MEDIUM_HIGH: &[&str] = &["Low", "Medium", "High"];

/// Column name → labels from lowest to highest rank.
///
/// Every component that needs an ordinal order reads it from here; nothing
/// rebuilds or copies it.
pub static ORDINAL_RANKS: &[(&str, &[&str])] = &[
    ("Parental_Involvement", LOW_MEDIUM_HIGH),
    ("Access_to_Resources", LOW_MEDIUM_HIGH),
    ("Motivation_Level", LOW_MEDIUM_HIGH),
    ("Family_Income", LOW_MEDIUM_HIGH),
    ("Teacher_Quality", LOW_MEDIUM_HIGH),
    (
        "Parental_Education_Level",
        &["High School", "College", "Postgraduate"],
    ),
    ("Peer_Influence", &["Negative", "Neutral", "Positive"]),
];

/// Plain categorical columns the dashboard offers as factors and filters.
pub const KNOWN_CATEGORICAL: &[&str] = &[
    "School_Type",
    "Gender",
    "Extracurricular_Activities",
    "Internet_Access",
    "Learning_Disabilities",
    "Distance_from_Home",
];

/// Numeric factors plotted against the exam score.
pub const KNOWN_NUMERIC_FACTORS: &[&str] = &[
    "Hours_Studied",
    "Previous_Scores",
    "Attendance",
    "Sleep_Hours",
    "Physical_Activity",
    "Tutoring_Sessions",
];

/// Metrics shown in the individual-vs-population comparison.
pub const COMPARISON_METRICS: &[&str] = &[
    "Hours_Studied",
    "Attendance",
    "Previous_Scores",
    "Exam_Score",
    "Tutoring_Sessions",
    "Sleep_Hours",
];

/// Columns of the correlation heatmap.
pub const CORRELATION_COLUMNS: &[&str] = &[
    "Hours_Studied",
    "Attendance",
    "Sleep_Hours",
    "Previous_Scores",
    "Tutoring_Sessions",
    "Physical_Activity",
    "Exam_Score",
];

/// Declared order for `column`, if it is ordinal.
pub fn declared_order(column: &str) -> Option<&'static [&'static str]> {
    ORDINAL_RANKS
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, order)| *order)
}

/// Position of `label` within `order`, `None` for out-of-band labels.
pub fn rank_of(order: &[&str], label: &str) -> Option<usize> {
    order.iter().position(|l| *l == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ordinal_columns_resolve() {
        assert_eq!(declared_order("Motivation_Level"), Some(LOW_MEDIUM_HIGH));
        assert_eq!(
            declared_order("Peer_Influence"),
            Some(&["Negative", "Neutral", "Positive"][..])
        );
        assert_eq!(declared_order("Gender"), None);
    }

    #[test]
    fn rank_follows_declaration_not_spelling() {
        let order = declared_order("Parental_Education_Level").unwrap();
        assert_eq!(rank_of(order, "High School"), Some(0));
        assert_eq!(rank_of(order, "Postgraduate"), Some(2));
        assert_eq!(rank_of(order, "PhD"), None);
    }

    #[test]
    fn mapping_has_no_duplicate_columns() {
        for (i, (a, _)) in ORDINAL_RANKS.iter().enumerate() {
            assert!(ORDINAL_RANKS[i + 1..].iter().all(|(b, _)| a != b));
        }
    }
}
