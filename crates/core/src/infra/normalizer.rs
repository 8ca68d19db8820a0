/// テキスト正規化: 連続空白の圧縮、前後トリム
pub struct TextNormalizer;

/// Unicode 空白に加えて BOM (U+FEFF) も空白扱い
fn is_space(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}

impl TextNormalizer {
    /// 空白文字（スペース・タブ・改行・その他 Unicode 空白）の連続を
    /// 半角スペース 1 つに置き換え、前後の空白を除去する。
    /// 純粋・全域・冪等。
    pub fn normalize(text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut pending_space = false;

        for ch in text.chars() {
            if is_space(ch) {
                pending_space = !result.is_empty();
            } else {
                if pending_space {
                    result.push(' ');
                    pending_space = false;
                }
                result.push(ch);
            }
        }

        result
    }

    /// 単語数（空白区切り）。空または空白のみなら 0。
    pub fn word_count(text: &str) -> usize {
        text.split(is_space).filter(|w| !w.is_empty()).count()
    }

    /// 正規化で内容が変わるか
    pub fn needs_normalization(text: &str) -> bool {
        Self::normalize(text) != text
    }
}
