use crate::utils::error::{AidError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AidError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AidError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AidError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(AidError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 回傳小寫副檔名，方便呼叫端推斷 MIME 類型
pub fn validate_file_extension(
    field_name: &str,
    file: &str,
    allowed_extensions: &[&str],
) -> Result<String> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| AidError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        })?;

    if !allowed_set.contains(extension.as_str()) {
        return Err(AidError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        });
    }

    Ok(extension)
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AidError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// API 金鑰不可為空，也不可是未替換的 `${VAR}` 佔位符
pub fn validate_api_key(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AidError::MissingConfigError {
            field: field_name.to_string(),
        });
    }

    if value.starts_with("${") && value.ends_with('}') {
        return Err(AidError::ConfigValidationError {
            field: field_name.to_string(),
            message: format!("environment variable {} is not set", value),
        });
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AidError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("places.endpoint", "https://example.com").is_ok());
        assert!(validate_url("places.endpoint", "http://example.com").is_ok());
        assert!(validate_url("places.endpoint", "").is_err());
        assert!(validate_url("places.endpoint", "invalid-url").is_err());
        assert!(validate_url("places.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("places.radius_meters", 5000, 1).is_ok());
        assert!(validate_positive_number("places.radius_meters", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        let allowed = ["jpg", "jpeg", "png"];
        assert_eq!(
            validate_file_extension("image", "wound.JPG", &allowed).unwrap(),
            "jpg"
        );
        assert!(validate_file_extension("image", "wound.png", &allowed).is_ok());
        assert!(validate_file_extension("image", "wound.gif", &allowed).is_err());
        assert!(validate_file_extension("image", "wound", &allowed).is_err());
    }

    #[test]
    fn test_validate_api_key() {
        assert!(validate_api_key("gemini.api_key", "AIza-test").is_ok());
        assert!(matches!(
            validate_api_key("gemini.api_key", "  "),
            Err(AidError::MissingConfigError { .. })
        ));
        assert!(matches!(
            validate_api_key("gemini.api_key", "${GOOGLE_API_KEY}"),
            Err(AidError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("gemini.temperature", 0.1, 0.0, 2.0).is_ok());
        assert!(validate_range("gemini.temperature", 2.5, 0.0, 2.0).is_err());
    }
}
