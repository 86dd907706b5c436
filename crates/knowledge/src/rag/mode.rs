//! Rule-based mode routing. No model call is involved.
//!
//! Rules run in order and the first match wins; explicit file or locate
//! intent outranks topic words. Nothing matching keeps the session's mode.
//!
//! English terms match whole words. Japanese has no word separators, so the
//! `*_JA` terms match anywhere in the input.

use crate::types::Mode;
use unicode_segmentation::UnicodeSegmentation;

const FILE_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".txt", ".csv", ".md"];

const LOCATE_TERMS: &[&str] = &[
    "find",
    "locate",
    "where is",
    "where are",
    "which file",
    "which document",
    "reference",
    "file path",
    "location",
];

const LOCATE_TERMS_JA: &[&str] = &["参照", "探して", "ありか", "場所", "ファイル"];

const TABLE_PHRASES: &[&str] = &["as a table", "in a table", "table of", "tabulate"];
const ROSTER_SUBJECTS: &[&str] = &["staff", "employee", "employees", "roster"];
const ROSTER_SHAPES: &[&str] = &["list", "table"];
const ROSTER_SUBJECTS_JA: &[&str] = &["従業員", "社員", "スタッフ"];
const ROSTER_SHAPES_JA: &[&str] = &["一覧", "リスト", "表"];

const INQUIRY_TERMS: &[&str] = &[
    "summarize",
    "summarise",
    "summary",
    "explain",
    "procedure",
    "steps",
    "pros",
    "cons",
    "merits",
    "demerits",
    "overview",
    "what is",
    "what are",
    "how to",
    "how do",
    "why",
    "policy",
    "plan",
    "role",
    "list",
];

const INQUIRY_TERMS_JA: &[&str] = &[
    "一覧化",
    "一覧にして",
    "要約",
    "説明して",
    "教えて",
    "まとめ",
    "ポイント",
    "とは",
    "作り方",
    "手順",
    "計画",
    "方針",
    "役割",
    "メリット",
    "デメリット",
];

const SEARCH_TERMS: &[&str] = &[
    "where",
    "path",
    "folder",
    "directory",
    "file",
    "files",
    "saved",
    "stored",
    "minutes",
    "exists",
];

const SEARCH_TERMS_JA: &[&str] = &[
    "どこ",
    "議事録",
    "パス",
    "存在",
    "保存先",
    "フォルダ",
    "ディレクトリ",
];

/// Routing outcome for one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub mode: Mode,
    /// The input asked for a table rendering; callers may answer it directly.
    pub direct_table: bool,
}

/// Mode for `input`, falling back to `current_mode`.
pub fn classify(input: &str, current_mode: Mode) -> Mode {
    route(input, current_mode).mode
}

/// Full routing decision, including the direct-table flag.
pub fn route(input: &str, current_mode: Mode) -> Classification {
    let lower = input.to_lowercase();
    let words = Phrases::new(&lower);
    let mentions = |terms: &[&str]| terms.iter().any(|term| lower.contains(term));

    let decided = |mode| Classification {
        mode,
        direct_table: false,
    };

    if mentions(FILE_EXTENSIONS) || words.any(LOCATE_TERMS) || mentions(LOCATE_TERMS_JA) {
        return decided(Mode::DocumentSearch);
    }

    let roster_table = (words.any(ROSTER_SUBJECTS) && words.any(ROSTER_SHAPES))
        || (mentions(ROSTER_SUBJECTS_JA) && mentions(ROSTER_SHAPES_JA));
    if words.any(TABLE_PHRASES) || roster_table {
        return Classification {
            mode: Mode::Inquiry,
            direct_table: true,
        };
    }

    if words.any(INQUIRY_TERMS) || mentions(INQUIRY_TERMS_JA) {
        return decided(Mode::Inquiry);
    }

    if words.any(SEARCH_TERMS) || mentions(SEARCH_TERMS_JA) {
        return decided(Mode::DocumentSearch);
    }

    decided(current_mode)
}

/// Space-delimited word sequence for whole-word and phrase matching.
struct Phrases(String);

impl Phrases {
    fn new(lower: &str) -> Self {
        Self(format!(" {} ", lower.unicode_words().collect::<Vec<_>>().join(" ")))
    }

    fn any(&self, terms: &[&str]) -> bool {
        terms
            .iter()
            .any(|term| self.0.contains(&format!(" {} ", term)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_wins() {
        assert_eq!(classify("find rules.pdf", Mode::Inquiry), Mode::DocumentSearch);
        assert_eq!(
            classify("Summarize Handbook.DOCX please", Mode::Inquiry),
            Mode::DocumentSearch
        );
    }

    #[test]
    fn test_locate_vocabulary() {
        assert_eq!(
            classify("Where is the staff roster", Mode::Inquiry),
            Mode::DocumentSearch
        );
        assert_eq!(
            classify("Which document covers overtime?", Mode::Inquiry),
            Mode::DocumentSearch
        );
    }

    #[test]
    fn test_summarize_is_inquiry() {
        assert_eq!(
            classify("summarize the onboarding policy", Mode::DocumentSearch),
            Mode::Inquiry
        );
        assert_eq!(
            classify("Explain the pros and cons of remote work", Mode::DocumentSearch),
            Mode::Inquiry
        );
    }

    #[test]
    fn test_table_request_sets_direct_flag() {
        let routed = route("Show the sales staff as a table", Mode::DocumentSearch);
        assert_eq!(routed.mode, Mode::Inquiry);
        assert!(routed.direct_table);

        let routed = route("employee list for HR", Mode::DocumentSearch);
        assert!(routed.direct_table);

        assert!(!route("summarize the plan", Mode::DocumentSearch).direct_table);
    }

    #[test]
    fn test_search_vocabulary() {
        assert_eq!(
            classify("Which folder has the meeting minutes", Mode::Inquiry),
            Mode::DocumentSearch
        );
    }

    #[test]
    fn test_no_rule_keeps_current_mode() {
        assert_eq!(classify("thanks!", Mode::Inquiry), Mode::Inquiry);
        assert_eq!(classify("thanks!", Mode::DocumentSearch), Mode::DocumentSearch);
        assert_eq!(classify("", Mode::Inquiry), Mode::Inquiry);
    }

    #[test]
    fn test_japanese_locate_request() {
        assert_eq!(
            classify("就業規則のファイルを探して", Mode::Inquiry),
            Mode::DocumentSearch
        );
        assert_eq!(classify("申請書の場所", Mode::Inquiry), Mode::DocumentSearch);
    }

    #[test]
    fn test_japanese_roster_table() {
        let routed = route("営業部の社員一覧を表示して", Mode::DocumentSearch);
        assert_eq!(routed.mode, Mode::Inquiry);
        assert!(routed.direct_table);
    }

    #[test]
    fn test_japanese_inquiry() {
        assert_eq!(
            classify("経費精算の手順を教えて", Mode::DocumentSearch),
            Mode::Inquiry
        );
        assert_eq!(classify("人事評価のメリット", Mode::DocumentSearch), Mode::Inquiry);
    }

    #[test]
    fn test_japanese_search_terms() {
        assert_eq!(classify("先週の議事録はどこ？", Mode::Inquiry), Mode::DocumentSearch);
        assert_eq!(classify("見積書の保存先", Mode::Inquiry), Mode::DocumentSearch);
    }

    #[test]
    fn test_whole_words_only() {
        // "findings" is not "find", "profile" is not "file"
        assert_eq!(classify("quarterly findings profile", Mode::Inquiry), Mode::Inquiry);
    }
}
