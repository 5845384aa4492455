//! 应用语言代码到 DeepL 语言代码的映射

/// 源语言映射，无法映射时返回 `None` 交给 DeepL 自动检测
pub fn deepl_source_language(code: &str) -> Option<&'static str> {
    match code {
        "en" => Some("EN"),
        "zh-CHS" | "zh-CHT" => Some("ZH"),
        "es" => Some("ES"),
        "fr" => Some("FR"),
        "ar" => Some("AR"),
        "de" => Some("DE"),
        "it" => Some("IT"),
        "ja" => Some("JA"),
        "pt" => Some("PT"),
        "ru" => Some("RU"),
        "tr" => Some("TR"),
        _ => None,
    }
}

/// 目标语言映射，无法映射时退回 `EN-US`
pub fn deepl_target_language(code: &str) -> &'static str {
    match code {
        "en" => "EN-US",
        "zh-CHS" => "ZH-HANS",
        "zh-CHT" => "ZH-HANT",
        "es" => "ES",
        "fr" => "FR",
        "ar" => "AR",
        "de" => "DE",
        "it" => "IT",
        "ja" => "JA",
        "pt" => "PT-PT",
        "ru" => "RU",
        "tr" => "TR",
        _ => "EN-US",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mapping() {
        assert_eq!(deepl_source_language("zh-CHT"), Some("ZH"));
        assert_eq!(deepl_source_language("pt"), Some("PT"));
        assert_eq!(deepl_source_language("auto"), None);
        assert_eq!(deepl_source_language("ko"), None);
    }

    #[test]
    fn test_target_mapping() {
        assert_eq!(deepl_target_language("zh-CHS"), "ZH-HANS");
        assert_eq!(deepl_target_language("pt"), "PT-PT");
        assert_eq!(deepl_target_language("tr"), "TR");
        assert_eq!(deepl_target_language("ko"), "EN-US");
    }
}
