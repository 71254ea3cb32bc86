//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y limpieza de nombres de fichero.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use validator::ValidationError;

fn http_url_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").ok())
        .as_ref()
}

/// Validar que un string no esté vacío (ni solo espacios)
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que la URL sea http o https
pub fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    let valid = http_url_regex().is_some_and(|re| re.is_match(value.trim()));
    if !valid {
        let mut error = ValidationError::new("http_url");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Nombre de fichero seguro: solo la última componente, sin caracteres
/// raros. Nunca devuelve un nombre vacío.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "archivo".to_string()
    } else {
        cleaned
    }
}

/// Nombre libre dentro de `dir`: `name`, `name_1.ext`, `name_2.ext`...
pub fn unique_file_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
        _ => (name, String::new()),
    };
    let mut counter = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, counter, ext);
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Texto opcional: `None` si viene vacío
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("1234ABC").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("https://www.coches.net/anuncio/123").is_ok());
        assert!(validate_http_url("http://wallapop.com").is_ok());
        assert!(validate_http_url("ftp://example.com").is_err());
        assert!(validate_http_url("javascript:alert(1)").is_err());
        assert!(validate_http_url("").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("factura taller.pdf"), "factura_taller.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\fotos\\frontal.jpg"), "frontal.jpg");
        assert_eq!(sanitize_file_name(".."), "archivo");
        assert_eq!(sanitize_file_name(""), "archivo");
    }

    #[test]
    fn test_unique_file_name() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_file_name(dir.path(), "foto.jpg"), "foto.jpg");
        std::fs::write(dir.path().join("foto.jpg"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "foto.jpg"), "foto_1.jpg");
        std::fs::write(dir.path().join("foto_1.jpg"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "foto.jpg"), "foto_2.jpg");
        std::fs::write(dir.path().join("LEEME"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "LEEME"), "LEEME_1");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" Ana ".to_string())), Some("Ana".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
