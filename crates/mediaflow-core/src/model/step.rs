//! Orden de steps y su prefijo de sort-key en la partición de sesión.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Triage,
    Selection,
    Enhancement,
    Grouping,
    Download,
    Description,
    Publish,
}

/// Orden total de los steps, tal como lo recorre la cascada inter-step.
pub const STEP_ORDER: [Step; 7] = [
    Step::Triage,
    Step::Selection,
    Step::Enhancement,
    Step::Grouping,
    Step::Download,
    Step::Description,
    Step::Publish,
];

impl Step {
    /// Prefijo de sort-key en la partición `SESSION#{id}` (§3.5, §6.3).
    pub fn sort_key_prefix(&self) -> &'static str {
        match self {
            Step::Triage => "TRIAGE#",
            Step::Selection => "SELECTION#",
            Step::Enhancement => "ENHANCE#",
            Step::Grouping => "GROUP#",
            Step::Download => "DOWNLOAD#",
            Step::Description => "DESC#",
            Step::Publish => "PUBLISH#",
        }
    }

    pub fn position(&self) -> usize {
        STEP_ORDER.iter().position(|s| s == self).expect("Step is always in STEP_ORDER")
    }

    /// Prefijos de todos los steps en `[self, end]`, usados por la cascada de
    /// invalidación (§4.7).
    pub fn downstream_prefixes(&self) -> Vec<&'static str> {
        STEP_ORDER[self.position()..].iter().map(Step::sort_key_prefix).collect()
    }
}

pub const META_SORT_KEY: &str = "META";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_order_matches_spec_tuple() {
        assert_eq!(
            STEP_ORDER,
            [
                Step::Triage,
                Step::Selection,
                Step::Enhancement,
                Step::Grouping,
                Step::Download,
                Step::Description,
                Step::Publish,
            ]
        );
    }

    #[test]
    fn downstream_prefixes_from_enhancement() {
        let prefixes = Step::Enhancement.downstream_prefixes();
        assert_eq!(
            prefixes,
            vec!["ENHANCE#", "GROUP#", "DOWNLOAD#", "DESC#", "PUBLISH#"]
        );
    }

    #[test]
    fn downstream_prefixes_from_triage_covers_everything() {
        assert_eq!(Step::Triage.downstream_prefixes().len(), 7);
    }

    #[test]
    fn downstream_prefixes_from_publish_is_just_publish() {
        assert_eq!(Step::Publish.downstream_prefixes(), vec!["PUBLISH#"]);
    }

}
