//! Matrículas
//!
//! La matrícula es la clave primaria del vehículo. Siempre se guarda sin
//! espacios alrededor y en mayúsculas.

/// Normaliza una matrícula: `None` si queda vacía
pub fn normalize_plate(value: &str) -> Option<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Nombre de carpeta seguro para los archivos del vehículo
pub fn vehicle_storage_key(plate: &str) -> String {
    let safe: String = plate
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "unknown".to_string()
    } else {
        safe
    }
}

/// Matrícula de copia: `<BASE>-C<n>`
pub fn copy_plate(base: &str, n: u32) -> String {
    format!("{}-C{}", base, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate("  1234abc "), Some("1234ABC".to_string()));
        assert_eq!(normalize_plate("   "), None);
    }

    #[test]
    fn test_storage_key_replaces_unsafe_chars() {
        assert_eq!(vehicle_storage_key("12 34/ab"), "12_34_AB");
        assert_eq!(vehicle_storage_key("../x"), "___X");
        assert_eq!(vehicle_storage_key(""), "unknown");
        assert_eq!(vehicle_storage_key("AB-12_c"), "AB-12_C");
    }

    #[test]
    fn test_copy_plate() {
        assert_eq!(copy_plate("1234ABC", 2), "1234ABC-C2");
    }
}
