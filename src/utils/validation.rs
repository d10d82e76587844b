use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static HANDLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

/// 验证用户名格式（3-20个字符，字母、数字、下划线；唯一性检查不区分大小写，由服务层负责）
pub fn validate_handle(handle: &str) -> Result<()> {
    if handle.trim().is_empty() {
        return Err(AppError::Validation("用户名不能为空".to_string()));
    }

    if handle.len() < 3 {
        return Err(AppError::Validation("用户名至少需要3个字符".to_string()));
    }

    if handle.len() > 20 {
        return Err(AppError::Validation("用户名不能超过20个字符".to_string()));
    }

    if !HANDLE_REGEX.is_match(handle) {
        return Err(AppError::Validation("用户名只能包含字母、数字和下划线".to_string()));
    }

    Ok(())
}

/// 验证显示名称格式
pub fn validate_display_name(display_name: &str) -> Result<()> {
    if display_name.trim().is_empty() {
        return Err(AppError::Validation("显示名称不能为空".to_string()));
    }

    if display_name.len() > 50 {
        return Err(AppError::Validation("显示名称不能超过50个字符".to_string()));
    }

    Ok(())
}

/// 验证正文类内容：去除首尾空白后非空，且不超过 max_len 个字符。
/// 返回修剪后的文本
pub fn validate_text_content(content: &str, max_len: usize, field: &str) -> Result<String> {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{}不能为空", field)));
    }

    if trimmed.chars().count() > max_len {
        return Err(AppError::Validation(format!("{}不能超过{}个字符", field, max_len)));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_handle() {
        // 有效用户名
        assert!(validate_handle("user123").is_ok());
        assert!(validate_handle("night_owl").is_ok());
        assert!(validate_handle("abc").is_ok());
        assert!(validate_handle(&"a".repeat(20)).is_ok());

        // 无效用户名
        assert!(validate_handle("").is_err());
        assert!(validate_handle("ab").is_err());
        assert!(validate_handle("user-name").is_err());
        assert!(validate_handle("user name").is_err());
        assert!(validate_handle("user@name").is_err());
        assert!(validate_handle(&"a".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Emily D").is_ok());
        assert!(validate_display_name("夜枭").is_ok());

        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_text_content() {
        assert_eq!(validate_text_content("  hope is the thing  ", 50, "帖子内容").unwrap(), "hope is the thing");

        assert!(validate_text_content("", 50, "帖子内容").is_err());
        assert!(validate_text_content("   \n\t ", 50, "帖子内容").is_err());
        assert!(validate_text_content(&"字".repeat(51), 50, "帖子内容").is_err());
        // 恰好到达上限仍然有效
        assert!(validate_text_content(&"字".repeat(50), 50, "帖子内容").is_ok());
    }
}
