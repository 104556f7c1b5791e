// src/common/identity.rs

// Normalização de identidade compartilhada entre o cadastro de motoristas e
// a deduplicação da lista de disponibilidade. O telefone normalizado (só
// dígitos) é a chave natural secundária de um motorista dentro da base.

/// Remove tudo que não for dígito. "(21) 99999-0000" -> "21999990000".
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Um identificador composto só de dígitos é, na prática, um telefone usado
/// como id (registro importado). Ids gerados pelo armazenamento sempre têm
/// letras.
pub fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// Nomes vazios ou de preenchimento não contam como nome de verdade na
/// escolha do sobrevivente da deduplicação.
pub fn is_placeholder_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("motorista")
        || trimmed.eq_ignore_ascii_case("sem nome")
        || trimmed == "-"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normaliza_telefone_com_mascara() {
        assert_eq!(normalize_phone("(21) 99999-0000"), "21999990000");
        assert_eq!(normalize_phone("+55 21 99999 0000"), "5521999990000");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn identifica_id_numerico() {
        assert!(is_numeric_id("21999990000"));
        assert!(!is_numeric_id("aB3xYz9"));
        assert!(!is_numeric_id(""));
    }

    #[test]
    fn identifica_nome_de_preenchimento() {
        assert!(is_placeholder_name(""));
        assert!(is_placeholder_name("  "));
        assert!(is_placeholder_name("Motorista"));
        assert!(is_placeholder_name("-"));
        assert!(!is_placeholder_name("João da Silva"));
    }
}
