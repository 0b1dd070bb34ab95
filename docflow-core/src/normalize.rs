use crate::model::AskRequest;
use unicode_normalization::UnicodeNormalization;

const MAX_FILE_NUM: u32 = 50_000;

fn clean_text(s: &str) -> String {
    // Unicode NFC normalization + BOM strip + CRLF -> LF + trim
    let mut t = s.nfc().collect::<String>();
    if t.starts_with('\u{FEFF}') {
        // Byte Order Mark
        t.remove(0);
    }
    if t.contains("\r\n") {
        t = t.replace("\r\n", "\n");
    }
    t.trim().to_string()
}

/// Normalize a caller request before dispatch: clean the question and user
/// id, cap the requested document length.
pub fn normalize_ask(mut req: AskRequest) -> AskRequest {
    req.question = clean_text(&req.question);
    req.user = req.user.trim().to_string();
    req.conversation_id = req.conversation_id.trim().to_string();
    if req.inputs.file_num > MAX_FILE_NUM {
        req.inputs.file_num = MAX_FILE_NUM;
    }
    if req.inputs.style.trim().is_empty() {
        req.inputs.style = "不指定".to_string();
    }
    req
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_question_and_user() {
        let out = normalize_ask(AskRequest::new("  写个大纲   ", " u1 "));
        assert_eq!(out.question, "写个大纲");
        assert_eq!(out.user, "u1");
    }

    #[test]
    fn unicode_nfc_and_crlf_normalization() {
        // "e" + combining acute accent should normalize to "é"
        let out = normalize_ask(AskRequest::new("e\u{301}", "u"));
        assert_eq!(out.question, "é");

        let out2 = normalize_ask(AskRequest::new("line1\r\nline2", "u"));
        assert_eq!(out2.question, "line1\nline2");
    }

    #[test]
    fn strips_bom() {
        let out = normalize_ask(AskRequest::new("\u{FEFF}hello", "u"));
        assert_eq!(out.question, "hello");
    }

    #[test]
    fn caps_file_num_and_defaults_style() {
        let mut req = AskRequest::new("q", "u");
        req.inputs.file_num = 1_000_000;
        req.inputs.style = "  ".into();
        let out = normalize_ask(req);
        assert_eq!(out.inputs.file_num, MAX_FILE_NUM);
        assert_eq!(out.inputs.style, "不指定");
    }
}
