use ammonia::Builder;
use maplit::hashset;
use std::collections::HashSet;

fn text_sanitizer() -> Builder<'static> {
    // 纯文本平台：不允许任何标签，只保留文字内容
    let tags: HashSet<&str> = hashset![];

    let mut sanitizer = Builder::default();
    sanitizer
        .tags(tags)
        .clean_content_tags(hashset!["script", "style"]);
    sanitizer
}

/// 持久化前的内容清洗：剥离所有标签与可执行内容，保留文字。
/// 纯函数，供帖子正文、出处署名、评论内容共用
pub fn sanitize_text(input: &str) -> String {
    text_sanitizer().clean(input).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(sanitize_text("the fog comes on little cat feet"), "the fog comes on little cat feet");
    }

    #[test]
    fn test_strips_tags_keeps_text() {
        assert_eq!(sanitize_text("<b>bold</b> words"), "bold words");
        assert_eq!(sanitize_text("<a href=\"https://x.y\">link</a>"), "link");
    }

    #[test]
    fn test_drops_script_content_entirely() {
        assert_eq!(sanitize_text("before<script>alert(1)</script>after"), "beforeafter");
        assert_eq!(sanitize_text("<style>p{}</style>verse"), "verse");
    }

    #[test]
    fn test_event_handlers_removed() {
        let cleaned = sanitize_text("<img src=x onerror=alert(1)>quote");
        assert!(!cleaned.contains("onerror"));
        assert!(cleaned.contains("quote"));
    }
}
