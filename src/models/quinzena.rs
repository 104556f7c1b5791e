// src/models/quinzena.rs

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Quinzena de dias trabalhados de um motorista: um documento por
// (base, motorista, mês, ano), dividido em primeira e segunda metade do
// mês. As listas guardam as datas cruas ("YYYY-MM-DD") e ADMITEM data
// repetida; a contagem é derivada. Expomos lista e contagem para que as
// duas leituras possam ser auditadas.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quinzena {
    pub month: u32,
    pub year: i32,
    pub first_half: Vec<String>,
    pub second_half: Vec<String>,
}

impl Quinzena {
    pub fn new(month: u32, year: i32) -> Self {
        Self {
            month,
            year,
            first_half: Vec::new(),
            second_half: Vec::new(),
        }
    }

    /// Registra um dia trabalhado. Dia 1 a 15 cai na primeira metade.
    pub fn push_date(&mut self, date: NaiveDate) {
        let formatted = date.format("%Y-%m-%d").to_string();
        if date.day() <= 15 {
            self.first_half.push(formatted);
        } else {
            self.second_half.push(formatted);
        }
    }

    /// (dias na primeira metade, dias na segunda metade).
    pub fn counts(&self) -> (usize, usize) {
        (self.first_half.len(), self.second_half.len())
    }

    /// Se a data já consta na metade correspondente.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let formatted = date.format("%Y-%m-%d").to_string();
        if date.day() <= 15 {
            self.first_half.contains(&formatted)
        } else {
            self.second_half.contains(&formatted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_pelo_dia_quinze() {
        let mut q = Quinzena::new(8, 2026);
        q.push_date(NaiveDate::from_ymd_opt(2026, 8, 15).unwrap());
        q.push_date(NaiveDate::from_ymd_opt(2026, 8, 16).unwrap());
        assert_eq!(q.counts(), (1, 1));
    }

    #[test]
    fn contains_olha_a_metade_certa() {
        let mut q = Quinzena::new(8, 2026);
        let dia = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        assert!(!q.contains(dia));
        q.push_date(dia);
        assert!(q.contains(dia));
        assert!(!q.contains(NaiveDate::from_ymd_opt(2026, 8, 20).unwrap()));
    }

    #[test]
    fn data_repetida_eh_preservada() {
        let mut q = Quinzena::new(8, 2026);
        let dia = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        q.push_date(dia);
        q.push_date(dia);
        assert_eq!(q.first_half, vec!["2026-08-10", "2026-08-10"]);
        assert_eq!(q.counts(), (2, 0));
    }
}
