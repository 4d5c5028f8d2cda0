//! Supplemental queries for regulated substances.
//!
//! A general activity search rarely surfaces specialist regimes such as
//! liquor licensing or poisons permits, so each declared category adds a few
//! narrow phrases that are searched on their own.

use indexmap::IndexSet;

use crate::types::config::PhraseTable;
use crate::types::request::ControlledSubstances;

/// Ordered, deduplicated supplemental phrases for the declared categories.
///
/// Categories are visited alcohol, medicines, chemicals. A non-empty poisons
/// schedule list adds the scheduled-medicine phrases whether or not any other
/// medicine flag is set.
pub fn plan_supplemental(substances: &ControlledSubstances, phrases: &PhraseTable) -> Vec<String> {
    let mut planned: IndexSet<String> = IndexSet::new();

    if substances.alcohol.as_ref().is_some_and(|a| a.any()) {
        planned.extend(phrases.alcohol.iter().cloned());
    }
    if let Some(medicines) = &substances.medicines {
        if medicines.any() {
            planned.extend(phrases.medicines.iter().cloned());
        }
        if medicines.has_schedules() {
            planned.extend(phrases.scheduled_medicines.iter().cloned());
        }
    }
    if substances.chemicals.as_ref().is_some_and(|c| c.any()) {
        planned.extend(phrases.chemicals.iter().cloned());
    }

    planned.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::{AlcoholFlags, ChemicalFlags, MedicineFlags};

    fn plan(substances: &ControlledSubstances) -> Vec<String> {
        plan_supplemental(substances, &PhraseTable::default())
    }

    #[test]
    fn test_serve_on_premise_alcohol() {
        let substances = ControlledSubstances::declared().with_alcohol(AlcoholFlags {
            serve_on_premise: true,
            ..Default::default()
        });

        assert_eq!(
            plan(&substances),
            vec!["liquor licence", "responsible service of alcohol"]
        );
    }

    #[test]
    fn test_all_categories_in_order() {
        let substances = ControlledSubstances::declared()
            .with_alcohol(AlcoholFlags {
                takeaway: true,
                brew_or_distil: true,
                ..Default::default()
            })
            .with_medicines(MedicineFlags {
                dispense: true,
                schedules: vec!["S4".to_string()],
                ..Default::default()
            })
            .with_chemicals(ChemicalFlags {
                transport: true,
                ..Default::default()
            });

        assert_eq!(
            plan(&substances),
            vec![
                "liquor licence",
                "responsible service of alcohol",
                "scheduled medicines",
                "pharmacy",
                "poisons permit",
                "hazardous chemicals",
                "dangerous goods",
            ]
        );
    }

    #[test]
    fn test_schedules_alone_add_poisons_permit() {
        let substances = ControlledSubstances::declared().with_medicines(MedicineFlags {
            schedules: vec!["S8".to_string()],
            ..Default::default()
        });

        assert_eq!(plan(&substances), vec!["poisons permit"]);
    }

    #[test]
    fn test_categories_without_flags_add_nothing() {
        let substances = ControlledSubstances::declared()
            .with_alcohol(AlcoholFlags::default())
            .with_medicines(MedicineFlags {
                schedules: vec!["  ".to_string()],
                ..Default::default()
            })
            .with_chemicals(ChemicalFlags::default());

        assert!(plan(&substances).is_empty());
    }

    #[test]
    fn test_overlapping_phrases_deduplicated() {
        let phrases = PhraseTable {
            alcohol: vec!["licence".to_string(), "permit".to_string()],
            chemicals: vec!["permit".to_string(), "dangerous goods".to_string()],
            ..Default::default()
        };
        let substances = ControlledSubstances::declared()
            .with_alcohol(AlcoholFlags {
                serve_on_premise: true,
                ..Default::default()
            })
            .with_chemicals(ChemicalFlags {
                store: true,
                ..Default::default()
            });

        assert_eq!(
            plan_supplemental(&substances, &phrases),
            vec!["licence", "permit", "dangerous goods"]
        );
    }
}
